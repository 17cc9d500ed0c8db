//! Neural search provider — embeddings-based search over full document text
//! (modeled on Exa's `/search` endpoint). POST JSON, supports a preferred
//! domain allowlist and a trailing-date restriction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{FailureReason, ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "neural_search";

#[derive(Serialize)]
struct NeuralSearchRequest<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    search_type: &'a str,
    num_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<String>,
    contents: NeuralSearchContents,
}

#[derive(Serialize)]
struct NeuralSearchContents {
    text: NeuralSearchTextOpts,
}

#[derive(Serialize)]
struct NeuralSearchTextOpts {
    #[serde(rename = "maxCharacters")]
    max_characters: usize,
}

#[derive(Deserialize)]
struct NeuralSearchResponse {
    #[serde(default)]
    results: Vec<NeuralSearchHit>,
}

#[derive(Deserialize)]
struct NeuralSearchHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

pub struct NeuralSearchClient {
    pub preferred_domains: Vec<String>,
}

#[async_trait]
impl Searcher for NeuralSearchClient {
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

        let body = NeuralSearchRequest {
            query,
            search_type: "neural",
            num_results: limits.max_results,
            include_domains: if self.preferred_domains.is_empty() {
                None
            } else {
                Some(&self.preferred_domains)
            },
            start_published_date: Some(
                (chrono::Utc::now() - chrono::Duration::days(365)).format("%Y-%m-%d").to_string(),
            ),
            contents: NeuralSearchContents {
                text: NeuralSearchTextOpts { max_characters: 2000 },
            },
        };

        let resp = match http
            .post("https://api.exa.ai/search")
            .header("x-api-key", &key)
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
            if status.as_u16() == 429 {
                return ProviderResponse::SoftFailure { reason: "rate_limited".into() };
            }
            return ProviderResponse::SoftFailure { reason: format!("http_{status}") };
        }

        let parsed: NeuralSearchResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => return ProviderResponse::HardFailure { reason: format!("invalid json: {e}") },
        };

        if parsed.results.is_empty() {
            return ProviderResponse::SoftFailure { reason: "empty_response".into() };
        }

        let out = parsed
            .results
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.title.unwrap_or_else(|| hit.url.clone()),
                url: hit.url,
                snippet: hit.text.unwrap_or_default().chars().take(400).collect(),
                source_provider: PROVIDER.to_string(),
                relevance_score: hit.score.unwrap_or(0.5).clamp(0.0, 1.0),
                published_at: hit.published_date,
            })
            .collect();

        ProviderResponse::Success(out)
    }
}
