//! Quality Scorer (C5).
//!
//! Additive 0-100 model over five signals. `MIN_QUALITY_SCORE` (60) is the
//! rejection threshold C4/C6 apply; pages below it are dropped, never
//! stored as an `ExtractedPage`.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::types::Context;
use crate::providers::is_preferred_domain;

pub const MIN_QUALITY_SCORE: f64 = 60.0;

fn data_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\d+%").unwrap(),
            Regex::new(r"R\$\s?[\d.,]+").unwrap(),
            Regex::new(r"\d+\s*(mil|milh[aã]o|milh[oõ]es|bilh[aã]o|bilh[oõ]es)").unwrap(),
            Regex::new(r"\b20(1[5-9]|2[0-9])\b").unwrap(),
            Regex::new(r"\b\d{1,3}(?:[.,]\d{3})+\b").unwrap(),
        ]
    })
}

fn length_signal(content: &str) -> f64 {
    let len = content.chars().count();
    if len >= 2000 {
        20.0
    } else if len >= 1000 {
        15.0
    } else if len >= 500 {
        10.0
    } else {
        5.0
    }
}

fn context_overlap_signal(content: &str, context: &Context) -> f64 {
    let lower = content.to_lowercase();
    let hits = context
        .overlap_terms()
        .into_iter()
        .filter(|term| lower.contains(term.as_str()))
        .count();
    (hits as f64 * 10.0).min(30.0)
}

fn domain_reputation_signal(host: &str) -> f64 {
    if is_preferred_domain(host) {
        20.0
    } else if host.ends_with(".gov.br") || host.ends_with(".edu.br") {
        15.0
    } else if host.ends_with(".org.br") {
        10.0
    } else {
        5.0
    }
}

fn information_density_signal(content: &str) -> f64 {
    let words = content.split_whitespace().count();
    if words >= 500 {
        15.0
    } else if words >= 200 {
        10.0
    } else {
        5.0
    }
}

fn data_presence_signal(content: &str) -> f64 {
    let hits: usize = data_patterns().iter().map(|re| re.find_iter(content).count()).sum();
    (hits as f64 * 3.0).min(15.0)
}

/// `Score(content, url, context) → [0, 100]`, capped and never negative.
pub fn score(content: &str, url: &str, context: &Context) -> f64 {
    let host = url::Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string())).unwrap_or_default();

    let total = length_signal(content)
        + context_overlap_signal(content, context)
        + domain_reputation_signal(&host)
        + information_density_signal(content)
        + data_presence_signal(content);

    total.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(segment: &str) -> Context {
        Context {
            segment: Some(segment.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn short_low_signal_content_scores_low() {
        let s = score("short text", "https://example.com/page", &Context::default());
        assert!(s < MIN_QUALITY_SCORE);
    }

    #[test]
    fn rich_content_on_preferred_domain_clears_threshold() {
        let content = format!(
            "{} Mercado de telemedicina cresceu 40% em 2026, movimentando R$ 3,2 bilhões segundo dados do setor.",
            "telemedicina ".repeat(250)
        );
        let s = score(&content, "https://g1.globo.com/saude/noticia.ghtml", &ctx("telemedicina"));
        assert!(s >= MIN_QUALITY_SCORE, "expected >= {MIN_QUALITY_SCORE}, got {s}");
    }

    #[test]
    fn score_never_exceeds_100() {
        let content = format!(
            "telemedicina produto audiencia {} 50% R$ 100,00 2026 1.000.000",
            "palavra ".repeat(1000)
        );
        let ctx = Context {
            segment: Some("telemedicina".into()),
            product: Some("produto".into()),
            audience: Some("audiencia".into()),
            ..Default::default()
        };
        let s = score(&content, "https://g1.globo.com/x", &ctx);
        assert!(s <= 100.0);
    }

    #[test]
    fn data_presence_signal_caps_at_15() {
        let content = "50% 40% 30% 20% 10% 5% 1% 2% 3%".to_string();
        let s = data_presence_signal(&content);
        assert_eq!(s, 15.0);
    }
}
