//! Social aggregator client (C2's "Social aggregator" row): a single
//! POST-JSON call returning multi-platform posts with engagement metrics
//! already attached, used by C10 phase B alongside the trends client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    FailureReason, Platform, PlatformMetrics, ProviderResponse, SearchResult, SocialPost,
    ViralCategory,
};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "social_aggregator";

#[derive(Serialize)]
struct AggregatorRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct AggregatorResponse {
    #[serde(default)]
    posts: Vec<AggregatorPost>,
}

#[derive(Deserialize)]
struct AggregatorPost {
    platform: String,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    author_followers: Option<u64>,
    #[serde(default)]
    posted_at: Option<String>,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    shares: u64,
}

fn parse_platform(raw: &str) -> Option<Platform> {
    match raw.to_ascii_lowercase().as_str() {
        "youtube" => Some(Platform::Youtube),
        "instagram" => Some(Platform::Instagram),
        "facebook" => Some(Platform::Facebook),
        "twitter" | "x" => Some(Platform::Twitter),
        "tiktok" => Some(Platform::Tiktok),
        "linkedin" => Some(Platform::Linkedin),
        _ => None,
    }
}

pub struct SocialAggregatorClient;

#[async_trait]
impl Searcher for SocialAggregatorClient {
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
        match fetch_posts(http, keypool, query, limits).await {
            Ok(posts) if posts.is_empty() => {
                ProviderResponse::SoftFailure { reason: "empty_response".into() }
            }
            Ok(posts) => ProviderResponse::Success(
                posts
                    .into_iter()
                    .map(|p| SearchResult {
                        title: p.title,
                        url: p.url,
                        snippet: p.description,
                        source_provider: PROVIDER.to_string(),
                        relevance_score: 0.5,
                        published_at: p.posted_at,
                    })
                    .collect(),
            ),
            Err(reason) => ProviderResponse::SoftFailure { reason },
        }
    }
}

/// Fetch raw multi-platform posts for viral discovery (C9) and phase B of
/// the collection orchestrator (C10). Engagement formulas are applied
/// downstream by C7 — this client only carries the raw counters.
pub async fn fetch_posts(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<SocialPost>, String> {
    let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
        return Err("all credentials in cooldown or none configured".to_string());
    };

    let resp = match http
        .post("https://api.socialaggregator.example/v1/posts")
        .bearer_auth(&key)
        .timeout(limits.timeout)
        .json(&AggregatorRequest { query, limit: limits.max_results })
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

    let parsed: AggregatorResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;

    let posts = parsed
        .posts
        .into_iter()
        .filter_map(|p| {
            let platform = parse_platform(&p.platform)?;
            Some(SocialPost {
                platform,
                url: p.url,
                title: p.title.unwrap_or_default(),
                description: p.description,
                author: p.author,
                author_followers: p.author_followers,
                metrics: PlatformMetrics {
                    views: p.views,
                    likes: p.likes,
                    comments: p.comments,
                    shares: p.shares,
                    ..Default::default()
                },
                hashtags: p.hashtags,
                mentions: Vec::new(),
                posted_at: p.posted_at,
                viral_score: 0.0,
                viral_category: ViralCategory::Popular,
            })
        })
        .collect();

    Ok(posts)
}
