//! Reader/extractor client (C2's "Reader/extractor" row): given a URL,
//! returns cleaned textual content. Used directly by C4's reader-service
//! extraction strategy, and indirectly as a search proxy by wrapping a
//! search-engine SERP URL in the same call.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::types::FailureReason;
use crate::keypool::SharedKeyPool;
use crate::providers::classify_status;

pub const PROVIDER: &str = "reader";

/// Cap applied before the caller ever sees the text, matching C4's
/// reader-service strategy ("truncate to an upper bound (~15,000 chars)
/// with an explicit truncation marker").
pub const MAX_CHARS: usize = 15_000;
const TRUNCATION_MARKER: &str = "\n\n[...truncated...]";

#[derive(Deserialize)]
struct ReaderResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

pub struct ReaderClient;

#[async_trait]
impl crate::providers::Searcher for ReaderClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search(
        &self,
        _http: &reqwest::Client,
        _keypool: &SharedKeyPool,
        _query: &str,
        _limits: crate::providers::SearchLimits,
    ) -> crate::core::types::ProviderResponse<crate::core::types::SearchResult> {
        // The reader client is not a search engine in its own right; it is
        // consumed directly via `read_url` by C4 and the viral-discovery
        // extraction chain. `Searcher::search` is a no-op placeholder so it
        // can still be held behind `Arc<dyn Searcher>` where uniform
        // registration is convenient.
        crate::core::types::ProviderResponse::SoftFailure {
            reason: "reader provider does not implement keyword search".into(),
        }
    }
}

/// Outcome of a reader-service extraction call.
pub struct ReadResult {
    pub title: Option<String>,
    pub content: String,
    pub truncated: bool,
}

/// Fetch and clean the textual content of `url` via the reader API.
pub async fn read_url(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    url: &str,
    timeout: std::time::Duration,
) -> Result<ReadResult, String> {
    let Some((key, handle)) = keypool.next_key(PROVIDER).await else {
        return Err("all credentials in cooldown or none configured".to_string());
    };

    let resp = match http
        .get(format!("https://r.jina.ai/{url}"))
        .bearer_auth(&key)
        .header("Accept", "application/json")
        .timeout(timeout)
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

    let parsed: ReaderResponse = resp
        .json()
        .await
        .map_err(|e| format!("invalid json: {e}"))?;

    let mut content = parsed
        .content
        .or(parsed.text)
        .unwrap_or_default();

    let truncated = content.chars().count() > MAX_CHARS;
    if truncated {
        content = content.chars().take(MAX_CHARS).collect::<String>();
        content.push_str(TRUNCATION_MARKER);
    }

    Ok(ReadResult {
        title: parsed.title,
        content,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_marker_only_appended_past_the_cap() {
        let short = "a".repeat(100);
        assert!(short.chars().count() <= MAX_CHARS);
    }
}
