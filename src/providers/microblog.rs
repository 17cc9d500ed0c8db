//! Microblog search client (C2's "Microblog search" row): a recent-search
//! GET with bearer auth and `public_metrics` expansion, Twitter/X-style.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::types::{
    FailureReason, Platform, PlatformMetrics, ProviderResponse, SearchResult, SocialPost,
    ViralCategory,
};
use crate::keypool::SharedKeyPool;
use crate::providers::{classify_status, SearchLimits, Searcher};

pub const PROVIDER: &str = "microblog_search";

#[derive(Deserialize)]
struct MicroblogResponse {
    #[serde(default)]
    data: Vec<MicroblogPost>,
    #[serde(default)]
    includes: Option<MicroblogIncludes>,
}

#[derive(Deserialize)]
struct MicroblogIncludes {
    #[serde(default)]
    users: Vec<MicroblogUser>,
}

#[derive(Deserialize)]
struct MicroblogUser {
    id: String,
    username: String,
    #[serde(default)]
    public_metrics: Option<MicroblogUserMetrics>,
}

#[derive(Deserialize)]
struct MicroblogUserMetrics {
    #[serde(default)]
    followers_count: u64,
}

#[derive(Deserialize)]
struct MicroblogPost {
    id: String,
    text: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    public_metrics: Option<MicroblogMetrics>,
}

#[derive(Deserialize, Default)]
struct MicroblogMetrics {
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    quote_count: u64,
}

fn extract_hashtags(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.starts_with('#') && w.len() > 1)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '#').to_string())
        .filter(|w| w.len() > 1)
        .collect()
}

pub struct MicroblogSearchClient;

#[async_trait]
impl Searcher for MicroblogSearchClient {
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
        match search_posts(http, keypool, query, limits).await {
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

pub async fn search_posts(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<SocialPost>, String> {
    let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
        return Err("all credentials in cooldown or none configured".to_string());
    };

    let resp = match http
        .get("https://api.twitter.com/2/tweets/search/recent")
        .bearer_auth(&key)
        .query(&[
            ("query", query.to_string()),
            ("max_results", limits.max_results.clamp(10, 100).to_string()),
            ("tweet.fields", "created_at,public_metrics".to_string()),
            ("expansions", "author_id".to_string()),
            ("user.fields", "username,public_metrics".to_string()),
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

    let parsed: MicroblogResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;
    if parsed.data.is_empty() {
        return Ok(Vec::new());
    }

    let users: std::collections::HashMap<String, MicroblogUser> = parsed
        .includes
        .map(|inc| inc.users.into_iter().map(|u| (u.id.clone(), u)).collect())
        .unwrap_or_default();

    let posts = parsed
        .data
        .into_iter()
        .map(|post| {
            let user = post.author_id.as_ref().and_then(|id| users.get(id));
            let metrics = post.public_metrics.unwrap_or_default();
            SocialPost {
                platform: Platform::Twitter,
                url: format!("https://twitter.com/i/web/status/{}", post.id),
                title: post.text.chars().take(80).collect(),
                description: post.text.clone(),
                author: user.map(|u| u.username.clone()).unwrap_or_default(),
                author_followers: user.and_then(|u| u.public_metrics.as_ref()).map(|m| m.followers_count),
                metrics: PlatformMetrics {
                    retweets: metrics.retweet_count,
                    likes: metrics.like_count,
                    replies: metrics.reply_count,
                    quotes: metrics.quote_count,
                    ..Default::default()
                },
                hashtags: extract_hashtags(&post.text),
                mentions: Vec::new(),
                posted_at: post.created_at,
                viral_score: 0.0,
                viral_category: ViralCategory::Popular,
            }
        })
        .collect();

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_hashtags_ignoring_bare_punctuation() {
        let tags = extract_hashtags("breaking #news about #Rust2026! see #");
        assert_eq!(tags, vec!["#news".to_string(), "#Rust2026".to_string()]);
    }
}
