//! Provider Clients (C2).
//!
//! One module per external API, each implementing the uniform [`Searcher`]
//! capability and registered with a [`ProviderRegistry`]. Adding a provider
//! is writing one struct and registering it — the orchestrator never
//! special-cases a provider name.

pub mod html_search;
pub mod meta_search;
pub mod microblog;
pub mod neural_search;
pub mod reader;
pub mod social_aggregator;
pub mod trends;
pub mod video;
pub mod video_thumbnail;
pub mod web_search;

use std::sync::Arc;
use std::time::Duration;

use crate::core::types::{FailureReason, ProviderResponse, SearchResult};
use crate::keypool::SharedKeyPool;

/// Caps passed down to every provider call. `max_results` is already divided
/// by the active engine count where C6 fans out across every available web
/// provider.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_results: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Uniform provider interface. `name()` doubles as the key-pool provider
/// name and the `source_provider` attribution tag.
#[async_trait::async_trait]
pub trait Searcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this provider requires a credential from the key pool. Pure
    /// scrape engines (no API key) return `false` and skip C1 entirely.
    fn requires_credential(&self) -> bool {
        true
    }

    /// Whether this client belongs to §4.10 Phase A's web fan-out (and
    /// §4.6's Level 1 multi-engine dig). Web-search-shaped clients (custom
    /// web search, neural search, meta-search, reader, the HTML-scrape
    /// engines) answer `true`, the default; the social/video/microblog/
    /// trends clients consumed separately by Phase C override this to
    /// `false` so `ProviderRegistry::web_providers` never double-dispatches
    /// them into both the web fan-out and their own dedicated fetch.
    fn is_web_provider(&self) -> bool {
        true
    }

    async fn search(
        &self,
        http: &reqwest::Client,
        keypool: &SharedKeyPool,
        query: &str,
        limits: SearchLimits,
    ) -> ProviderResponse<SearchResult>;
}

/// Registry of every provider wired into this run. Providers with zero
/// registered credentials (and that require one) are still present in the
/// registry but will report `SoftFailure` the first time they're called,
/// since `KeyPool::next_key` returns `None` for them.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Searcher>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Searcher>) {
        self.providers.push(provider);
    }

    pub fn all(&self) -> &[Arc<dyn Searcher>] {
        &self.providers
    }

    /// Clients eligible for §4.10 Phase A / §4.6 Level 1's web fan-out —
    /// excludes the social/video/microblog/trends clients, which Phase C
    /// and `research::research`'s callers fetch separately through their
    /// own dedicated functions.
    pub fn web_providers(&self) -> Vec<Arc<dyn Searcher>> {
        self.providers.iter().filter(|p| p.is_web_provider()).cloned().collect()
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
];

/// Rotating desktop User-Agent, shared by every HTML-scrape engine and the
/// extraction strategies in C4.
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::rng().random_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Detect a block page in a scrape-engine response: a blocked status code or
/// a captcha/rate-limit marker in the body.
pub fn engine_block_reason(status: reqwest::StatusCode, body: &str) -> Option<String> {
    match status.as_u16() {
        429 => return Some("http_429".to_string()),
        403 => return Some("http_403".to_string()),
        503 => return Some("http_503".to_string()),
        _ => {}
    }

    let lower = body.to_lowercase();
    let markers: &[(&str, &str)] = &[
        ("unusual traffic", "unusual_traffic"),
        ("captcha", "captcha"),
        ("recaptcha", "captcha"),
        ("verify you are human", "captcha"),
        ("enable javascript", "js_required"),
        ("access denied", "access_denied"),
    ];
    for (needle, label) in markers {
        if lower.contains(needle) {
            return Some(label.to_string());
        }
    }
    if body.len() < 3500 && lower.contains("blocked") {
        return Some("block_page".to_string());
    }
    None
}

/// Classify an HTTP status per the common provider-error table and map it to a
/// `FailureReason` for `KeyPool::mark_failed`. `None` means 2xx — no failure
/// to record.
pub fn classify_status(status: reqwest::StatusCode) -> Option<FailureReason> {
    match status.as_u16() {
        200..=299 => None,
        401 | 403 | 400 => Some(FailureReason::Auth),
        429 => Some(FailureReason::RateLimit),
        500..=599 => Some(FailureReason::ServerError),
        _ => Some(FailureReason::Other),
    }
}

/// Drop the high-noise tracking params search engines and social referrers
/// append (`utm_*`, `gclid`, `fbclid`, …) so aggregation dedup-by-URL isn't
/// fooled by cosmetic query-string differences.
pub fn normalize_url_key(url: &str) -> String {
    let trimmed = url.trim();
    let Ok(mut parsed) = url::Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let mut kept: Vec<(String, String)> = Vec::new();
        for (k, v) in parsed.query_pairs() {
            let kl = k.to_ascii_lowercase();
            if kl.starts_with("utm_")
                || matches!(kl.as_str(), "gclid" | "fbclid" | "yclid" | "mc_cid" | "mc_eid" | "ref" | "ref_src")
            {
                continue;
            }
            kept.push((k.to_string(), v.to_string()));
        }
        kept.sort();
        parsed.set_query(None);
        let mut qp = parsed.query_pairs_mut();
        for (k, v) in kept {
            qp.append_pair(&k, &v);
        }
    }

    parsed.to_string()
}

/// Curated high-trust hosts contributing to C5's domain-reputation signal;
/// also used here to tune aggregation-time confidence weighting.
pub fn is_preferred_domain(host: &str) -> bool {
    const PREFERRED: &[&str] = &[
        "wikipedia.org",
        "g1.globo.com",
        "folha.uol.com.br",
        "estadao.com.br",
        "exame.com",
        "valor.globo.com",
        "cnnbrasil.com.br",
        "reuters.com",
        "apnews.com",
    ];
    PREFERRED.iter().any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Decode a tracker-redirect URL, trying a handful of known wrapper shapes
/// (Bing `/ck/?u=a1<b64>`, a generic `?url=` / `?u=` querystring passthrough).
/// Falls back to the wrapper URL itself if decoding fails — decoding is
/// attempted once per known shape, covering base64 and querystring forms.
pub fn resolve_tracker_redirect(href: &str) -> String {
    use base64::Engine as _;

    let Ok(url) = url::Url::parse(href) else {
        return href.to_string();
    };

    let host = url.host_str().unwrap_or("");
    if matches!(host, "www.bing.com" | "bing.com") && url.path().starts_with("/ck/") {
        for (k, v) in url.query_pairs() {
            if k == "u" && !v.trim().is_empty() {
                let mut raw = v.to_string();
                if let Some(stripped) = raw.strip_prefix("a1") {
                    raw = stripped.to_string();
                }
                if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(&raw) {
                    if let Ok(s) = String::from_utf8(decoded) {
                        let s = s.trim();
                        if s.starts_with("http://") || s.starts_with("https://") {
                            return s.to_string();
                        }
                    }
                }
            }
        }
        return href.to_string();
    }

    for key in ["url", "u", "target", "q"] {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == key) {
            if v.starts_with("http://") || v.starts_with("https://") {
                return v.to_string();
            }
        }
    }

    href.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_key_strips_tracking_params() {
        let a = normalize_url_key("https://example.com/post?utm_source=x&id=1");
        let b = normalize_url_key("https://example.com/post?id=1");
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_tracker_redirect_decodes_bing_wrapper() {
        use base64::Engine as _;
        let target = "https://example.com/article";
        let encoded = base64::engine::general_purpose::STANDARD.encode(target);
        let wrapped = format!("https://www.bing.com/ck/a?!&&p=x&u=a1{encoded}");
        assert_eq!(resolve_tracker_redirect(&wrapped), target);
    }

    #[test]
    fn resolve_tracker_redirect_keeps_wrapper_on_decode_failure() {
        let wrapped = "https://www.bing.com/ck/a?!&&p=x&u=garbage";
        assert_eq!(resolve_tracker_redirect(wrapped), wrapped);
    }
}
