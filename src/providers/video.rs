//! Video search client (C2's "Video search" row): returns video id plus
//! statistics (views, likes, comments), falling back to a second batched
//! statistics call when the search response omits them.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::types::{
    FailureReason, Platform, PlatformMetrics, ProviderResponse, SearchResult, SocialPost,
};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "video_search";

#[derive(Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    items: Vec<VideoSearchItem>,
}

#[derive(Deserialize)]
struct VideoSearchItem {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    views: Option<u64>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    comments: Option<u64>,
}

#[derive(Deserialize)]
struct VideoStatsResponse {
    #[serde(default)]
    items: Vec<VideoStatsItem>,
}

#[derive(Deserialize)]
struct VideoStatsItem {
    id: String,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    comments: u64,
}

pub struct VideoSearchClient;

#[async_trait]
impl Searcher for VideoSearchClient {
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
        match search_videos(http, keypool, query, limits).await {
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

/// Search for videos and return them as `SocialPost`s with engagement
/// metrics filled in directly from the search response, or backfilled via
/// a batched statistics call when the search response omits them.
pub async fn search_videos(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<SocialPost>, String> {
    let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
        return Err("all credentials in cooldown or none configured".to_string());
    };

    let resp = match http
        .get("https://www.googleapis.com/youtube/v3/search")
        .query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("q", query),
            ("maxResults", &limits.max_results.clamp(1, 25).to_string()),
            ("key", &key),
        ])
        .timeout(limits.timeout)
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

    let parsed: VideoSearchResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;
    if parsed.items.is_empty() {
        return Ok(Vec::new());
    }

    let missing_stats = parsed.items.iter().any(|i| i.views.is_none());
    let stats: std::collections::HashMap<String, VideoStatsItem> = if missing_stats {
        fetch_stats(http, &key, parsed.items.iter().map(|i| i.id.as_str()), limits.timeout)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect()
    } else {
        Default::default()
    };

    let posts = parsed
        .items
        .into_iter()
        .map(|item| {
            let (views, likes, comments) = match (item.views, item.likes, item.comments) {
                (Some(v), Some(l), Some(c)) => (v, l, c),
                _ => match stats.get(&item.id) {
                    Some(s) => (s.views, s.likes, s.comments),
                    None => (0, 0, 0),
                },
            };
            let metrics = PlatformMetrics {
                views,
                likes,
                comments,
                ..Default::default()
            };
            SocialPost {
                platform: Platform::Youtube,
                url: format!("https://www.youtube.com/watch?v={}", item.id),
                title: item.title,
                description: item.description,
                author: item.channel_title.unwrap_or_default(),
                author_followers: None,
                metrics,
                hashtags: Vec::new(),
                mentions: Vec::new(),
                posted_at: item.published_at,
                viral_score: 0.0,
                viral_category: crate::core::types::ViralCategory::Popular,
            }
        })
        .collect();

    Ok(posts)
}

async fn fetch_stats(
    http: &reqwest::Client,
    key: &str,
    ids: impl Iterator<Item = &str>,
    timeout: std::time::Duration,
) -> Result<Vec<VideoStatsItem>, String> {
    let id_list = ids.collect::<Vec<_>>().join(",");
    if id_list.is_empty() {
        return Ok(Vec::new());
    }

    let resp = http
        .get("https://www.googleapis.com/youtube/v3/videos")
        .query(&[("part", "statistics"), ("id", &id_list), ("key", &key.to_string())])
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| format!("transport error: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("http_{}", resp.status()));
    }

    let parsed: VideoStatsResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;
    Ok(parsed.items)
}
