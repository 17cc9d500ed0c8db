//! HTML-search scrape providers (C2's "HTML-search scrape" row): GET the
//! SERP, parse result blocks out of the markup, resolve tracker-redirect
//! URLs. No API key — these never touch the key pool.

pub mod bing;
pub mod duckduckgo;
pub mod google;

use async_trait::async_trait;

use crate::core::types::{ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;
use crate::providers::{random_user_agent, SearchLimits, Searcher};

pub(crate) async fn fetch_serp_html(
    http: &reqwest::Client,
    url: reqwest::Url,
    timeout: std::time::Duration,
) -> Result<String, String> {
    let resp = http
        .get(url)
        .header("User-Agent", random_user_agent())
        .header("Accept", "text/html,application/xhtml+xml")
        .header("Accept-Language", "pt-BR,pt;q=0.9,en;q=0.8")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| format!("transport error: {e}"))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if let Some(reason) = super::engine_block_reason(status, &body) {
        return Err(reason);
    }

    Ok(body)
}

macro_rules! html_search_provider {
    ($struct_name:ident, $provider_name:literal, $search_fn:path) => {
        pub struct $struct_name;

        #[async_trait]
        impl Searcher for $struct_name {
            fn name(&self) -> &'static str {
                $provider_name
            }

            fn requires_credential(&self) -> bool {
                false
            }

            async fn search(
                &self,
                http: &reqwest::Client,
                _keypool: &SharedKeyPool,
                query: &str,
                limits: SearchLimits,
            ) -> ProviderResponse<SearchResult> {
                match $search_fn(http, query, limits).await {
                    Ok(results) if results.is_empty() => {
                        ProviderResponse::SoftFailure { reason: "empty_response".into() }
                    }
                    Ok(results) => ProviderResponse::Success(results),
                    Err(reason) => ProviderResponse::SoftFailure { reason },
                }
            }
        }
    };
}

html_search_provider!(GoogleHtmlSearchClient, "html_search_google", google::search);
html_search_provider!(BingHtmlSearchClient, "html_search_bing", bing::search);
html_search_provider!(DuckDuckGoHtmlSearchClient, "html_search_duckduckgo", duckduckgo::search);
