//! URL Relevance Filter (C3).
//!
//! `is_relevant` rejects a candidate `SearchResult` before it ever reaches
//! C4's extraction chain. Preferred-domain weighting lives in C5
//! (`crate::providers::is_preferred_domain`), not here — this module only
//! ever says yes/no, never scores.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;
use url::Url;

const BLOCKED_DOMAINS: &[&str] = &[
    "accounts.google.com",
    "accounts.google.com.br",
    "login.microsoftonline.com",
    "facebook.com",
    "m.facebook.com",
    "mercadolivre.com.br",
    "amazon.com.br",
    "amazon.com",
    "shopee.com.br",
    "magazineluiza.com.br",
];

const BLOCKED_PATH_PATTERNS: &[&str] = &[
    "/login", "/signin", "/sign-in", "/cart", "/checkout", "/carrinho", "/logout",
];

const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".webp", ".mp4", ".mov", ".zip", ".rar", ".exe", ".dmg",
];

/// Closed list of irrelevance markers; a result is rejected if
/// `title + snippet` contains at least two distinct markers.
const IRRELEVANCE_MARKERS: &[&str] = &[
    "login",
    "cart",
    "terms of use",
    "termos de uso",
    "privacy policy",
    "política de privacidade",
    "about us",
    "sobre nós",
    "careers",
    "carreiras",
];

fn host_is_blocked(host: &str) -> bool {
    BLOCKED_DOMAINS.iter().any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

fn path_is_blocked(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    BLOCKED_PATH_PATTERNS.iter().any(|p| lower.contains(p))
        || BLOCKED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn irrelevance_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(IRRELEVANCE_MARKERS)
            .expect("irrelevance marker patterns always compile")
    })
}

fn irrelevance_marker_count(title: &str, snippet: &str) -> usize {
    let haystack = format!("{title} {snippet}");
    let mut seen: Vec<usize> = irrelevance_matcher().find_iter(&haystack).map(|m| m.pattern().as_usize()).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// `IsRelevant(url, title, snippet) → bool`.
pub fn is_relevant(url: &str, title: &str, snippet: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if host_is_blocked(host) {
        return false;
    }
    if path_is_blocked(parsed.path()) {
        return false;
    }
    if irrelevance_marker_count(title, snippet) >= 2 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        assert!(!is_relevant("ftp://example.com/x", "t", "s"));
    }

    #[test]
    fn rejects_blocked_domain() {
        assert!(!is_relevant("https://www.amazon.com.br/produto/1", "t", "s"));
    }

    #[test]
    fn rejects_login_path() {
        assert!(!is_relevant("https://example.com/login", "t", "s"));
    }

    #[test]
    fn rejects_binary_extension() {
        assert!(!is_relevant("https://example.com/report.pdf", "t", "s"));
    }

    #[test]
    fn rejects_two_or_more_irrelevance_markers() {
        assert!(!is_relevant(
            "https://example.com/page",
            "Terms of Use",
            "Privacy Policy details"
        ));
    }

    #[test]
    fn keeps_single_marker() {
        assert!(is_relevant(
            "https://example.com/page",
            "Our Careers",
            "market overview for telemedicine in Brazil"
        ));
    }

    #[test]
    fn accepts_plain_article_url() {
        assert!(is_relevant(
            "https://g1.globo.com/economia/noticia/2026/telemedicina.ghtml",
            "Mercado de telemedicina cresce no Brasil",
            "Setor de telemedicina registra crescimento de 40% em 2026"
        ));
    }
}
