//! Trends MCP client (C2's "Trends MCP" row): a POST-JSON call returning
//! topical trends for query expansion, consumed by C10 phase B and by C6's
//! enhanced-query construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{FailureReason, ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "trends";

#[derive(Serialize)]
struct TrendsRequest<'a> {
    query: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    trends: Vec<TrendEntry>,
}

#[derive(Deserialize)]
struct TrendEntry {
    term: String,
    #[serde(default)]
    interest: Option<f64>,
    #[serde(default)]
    related_queries: Vec<String>,
}

pub struct TrendsClient;

#[async_trait]
impl Searcher for TrendsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn is_web_provider(&self) -> bool {
        false
    }

    async fn search(
        &self,
        http: &reqwest::Client,
        keypool: &SharedKeyPool,
        query: &str,
        limits: SearchLimits,
    ) -> ProviderResponse<SearchResult> {
        match fetch_trends(http, keypool, query, limits).await {
            Ok(trends) if trends.is_empty() => {
                ProviderResponse::SoftFailure { reason: "empty_response".into() }
            }
            Ok(trends) => ProviderResponse::Success(
                trends
                    .into_iter()
                    .map(|t| SearchResult {
                        title: t.term.clone(),
                        url: format!("trend:{}", t.term),
                        snippet: t.related_queries.join(", "),
                        source_provider: PROVIDER.to_string(),
                        relevance_score: t.interest.clamp(0.0, 1.0),
                        published_at: None,
                    })
                    .collect(),
            ),
            Err(reason) => ProviderResponse::SoftFailure { reason },
        }
    }
}

pub struct Trend {
    pub term: String,
    pub interest: f64,
    pub related_queries: Vec<String>,
}

pub async fn fetch_trends(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<Trend>, String> {
    let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
        return Err("all credentials in cooldown or none configured".to_string());
    };

    let resp = match http
        .post("https://api.trends.example/v1/topics")
        .bearer_auth(&key)
        .timeout(limits.timeout)
        .json(&TrendsRequest { query, region: "BR" })
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            keypool.mark_failed(handle, FailureReason::Network).await;
            return Err(format!("transport error: {e}"));
        }
    };

    let status = resp.status();
    if let Some(reason) = classify_status(status) {
        keypool.mark_failed(handle, reason).await;
        return Err(format!("http_{status}"));
    }

    let parsed: TrendsResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;

    Ok(parsed
        .trends
        .into_iter()
        .map(|t| Trend {
            term: t.term,
            interest: t.interest.unwrap_or(0.0),
            related_queries: t.related_queries,
        })
        .collect())
}
