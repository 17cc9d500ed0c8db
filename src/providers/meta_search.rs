//! Meta-search aggregator — a single POST-JSON call that fans a query out to
//! several upstream search engines itself and returns one unified
//! `organic[]` array (modeled on Serper-style aggregators).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{FailureReason, ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "meta_search";

#[derive(Serialize)]
struct MetaSearchRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    num: usize,
}

#[derive(Deserialize)]
struct MetaSearchResponse {
    #[serde(default)]
    organic: Vec<MetaSearchOrganicEntry>,
}

#[derive(Deserialize)]
struct MetaSearchOrganicEntry {
    link: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    position: Option<u32>,
}

pub struct MetaSearchClient;

#[async_trait]
impl Searcher for MetaSearchClient {
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

        let body = MetaSearchRequest {
            q: query,
            gl: "br",
            hl: "pt-br",
            num: limits.max_results,
        };

        let resp = match http
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", &key)
            .timeout(limits.timeout)
            .json(&body)
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

        let parsed: MetaSearchResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => return ProviderResponse::HardFailure { reason: format!("invalid json: {e}") },
        };

        if parsed.organic.is_empty() {
            return ProviderResponse::SoftFailure { reason: "empty_response".into() };
        }

        let n = parsed.organic.len().max(1) as f64;
        let out = parsed
            .organic
            .into_iter()
            .map(|entry| {
                // Higher list position -> higher relevance, normalized to [0,1].
                let rank = entry.position.unwrap_or(n as u32) as f64;
                SearchResult {
                    title: entry.title.unwrap_or_else(|| entry.link.clone()),
                    url: entry.link,
                    snippet: entry.snippet.unwrap_or_default(),
                    source_provider: PROVIDER.to_string(),
                    relevance_score: (1.0 - (rank - 1.0) / n).clamp(0.0, 1.0),
                    published_at: entry.date,
                }
            })
            .collect();

        ProviderResponse::Success(out)
    }
}
