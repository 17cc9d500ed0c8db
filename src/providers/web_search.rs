//! Custom web search provider — a GET-based programmable search API, pinned
//! to Brazilian Portuguese (`lr=lang_pt`, `gl=br`) and restricted to the
//! trailing 12 months.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::types::{FailureReason, ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "custom_web_search";

#[derive(Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Deserialize)]
struct CustomSearchItem {
    link: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

pub struct CustomWebSearchClient {
    pub search_engine_id: String,
}

#[async_trait]
impl Searcher for CustomWebSearchClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search(
        &self,
        http: &reqwest::Client,
        keypool: &SharedKeyPool,
        query: &str,
        limits: SearchLimits,
    ) -> ProviderResponse<SearchResult> {
        let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
            return ProviderResponse::SoftFailure {
                reason: "all credentials in cooldown or none configured".into(),
            };
        };

        // Trailing-window date restriction: last 12 months.
        let date_restrict = "m12";

        let resp = match http
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[
                ("key", key.as_str()),
                ("cx", self.search_engine_id.as_str()),
                ("q", query),
                ("lr", "lang_pt"),
                ("gl", "br"),
                ("dateRestrict", date_restrict),
                ("num", &limits.max_results.clamp(1, 10).to_string()),
            ])
            .timeout(limits.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                keypool.mark_failed(handle, FailureReason::Network).await;
                return ProviderResponse::HardFailure { reason: format!("transport error: {e}") };
            }
        };

        let status = resp.status();
        if let Some(reason) = classify_status(status) {
            keypool.mark_failed(handle, reason).await;
            return ProviderResponse::SoftFailure { reason: format!("http_{status}") };
        }

        let parsed: CustomSearchResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => return ProviderResponse::HardFailure { reason: format!("invalid json: {e}") },
        };

        if parsed.items.is_empty() {
            return ProviderResponse::SoftFailure { reason: "empty_response".into() };
        }

        let out = parsed
            .items
            .into_iter()
            .map(|item| SearchResult {
                title: item.title.unwrap_or_else(|| item.link.clone()),
                url: item.link,
                snippet: item.snippet.unwrap_or_default(),
                source_provider: PROVIDER.to_string(),
                relevance_score: 0.6,
                published_at: None,
            })
            .collect();

        ProviderResponse::Success(out)
    }
}
