//! Viral Discovery (C9).
//!
//! Builds a `ViralImage` record for each scored `SocialPost`: derives an
//! image via a platform-specific extraction tool when one exists (today:
//! YouTube thumbnail synthesis, C2's deterministic `video_thumbnail`), and
//! falls back to a clearly-flagged conservative estimate otherwise — gated
//! behind `disable_fallbacks` so a caller who cares can refuse synthetic
//! data entirely rather than receive a silent guess.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;

use crate::core::types::{EngagementEstimate, Platform, SocialPost, ViralImage};
use crate::providers::video_thumbnail;
use crate::viral;

const CTA_PATTERNS: &[&str] = &["link in bio", "buy now", "link na bio", "compre agora", "saiba mais no link"];
const URGENCY_PATTERNS: &[&str] = &["last spots", "últimas vagas", "oferta", "offer", "por tempo limitado", "apenas hoje"];
const SOCIAL_PROOF_PATTERNS: &[&str] = &["customers", "clientes", "results", "resultados", "depoimento"];
const HASHTAG_DENSITY_THRESHOLD: usize = 5;

fn pattern_matcher(patterns: &'static [&'static str]) -> AhoCorasick {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .expect("viral indicator patterns always compile")
}

fn any_pattern_matches(matcher_cell: &OnceLock<AhoCorasick>, patterns: &'static [&'static str], haystack: &str) -> bool {
    matcher_cell.get_or_init(|| pattern_matcher(patterns)).is_match(haystack)
}

fn try_platform_image_url(post: &SocialPost) -> Option<String> {
    match post.platform {
        Platform::Youtube => video_thumbnail::thumbnail_candidates_for_url(&post.url).and_then(|c| c.into_iter().next()),
        _ => None,
    }
}

fn engagement_estimate(post: &SocialPost) -> EngagementEstimate {
    EngagementEstimate {
        views: post.metrics.views,
        likes: post.metrics.likes,
        comments: post.metrics.comments,
        shares: post.metrics.shares.max(post.metrics.retweets),
    }
}

/// Inspect description text and hashtag count for human-readable viral
/// indicators.
pub fn viral_indicators(description: &str, hashtags: &[String]) -> Vec<String> {
    static CTA: OnceLock<AhoCorasick> = OnceLock::new();
    static URGENCY: OnceLock<AhoCorasick> = OnceLock::new();
    static SOCIAL_PROOF: OnceLock<AhoCorasick> = OnceLock::new();

    let mut out = Vec::new();

    if any_pattern_matches(&CTA, CTA_PATTERNS, description) {
        out.push("call-to-action language detected".to_string());
    }
    if any_pattern_matches(&URGENCY, URGENCY_PATTERNS, description) {
        out.push("urgency language detected".to_string());
    }
    if any_pattern_matches(&SOCIAL_PROOF, SOCIAL_PROOF_PATTERNS, description) {
        out.push("social-proof language detected".to_string());
    }
    if hashtags.len() > HASHTAG_DENSITY_THRESHOLD {
        out.push(format!("high hashtag density ({} tags)", hashtags.len()));
    }
    out
}

/// Build a `ViralImage` from a post already scored by C7. Returns `None`
/// when no real extraction tool succeeded and fallbacks are disabled.
pub fn build_viral_image(post: &SocialPost, disable_fallbacks: bool) -> Option<ViralImage> {
    let (image_url, is_estimate) = match try_platform_image_url(post) {
        Some(url) => (url, false),
        None if disable_fallbacks => return None,
        None => (post.url.clone(), true),
    };

    let engagement_score = viral::score(post.platform, &post.metrics);
    let quality_score = (engagement_score / 10.0 * 100.0).clamp(0.0, 100.0);

    Some(ViralImage {
        image_url,
        post_url: post.url.clone(),
        platform: post.platform,
        title: post.title.clone(),
        description: post.description.clone(),
        engagement_score,
        estimates: engagement_estimate(post),
        author: post.author.clone(),
        author_followers: post.author_followers,
        posted_at: post.posted_at.clone(),
        hashtags: post.hashtags.clone(),
        image_local_path: None,
        screenshot_local_path: None,
        quality_score,
        viral_indicators: viral_indicators(&post.description, &post.hashtags),
        is_estimate,
    })
}

/// Run C7 + the viral-image build step over every candidate post, keeping
/// only items at or above `MIN_VIRAL_SCORE`. Posts are pre-scored by the
/// caller or scored here if not.
pub fn discover(posts: Vec<SocialPost>, disable_fallbacks: bool) -> Vec<ViralImage> {
    viral::identify_viral(posts)
        .iter()
        .filter_map(|p| build_viral_image(p, disable_fallbacks))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PlatformMetrics, ViralCategory};

    fn post(platform: Platform, description: &str, hashtags: Vec<&str>) -> SocialPost {
        SocialPost {
            platform,
            url: "https://www.youtube.com/watch?v=abc123".into(),
            title: "t".into(),
            description: description.into(),
            author: "a".into(),
            author_followers: Some(1000),
            metrics: PlatformMetrics {
                views: 10_000_000,
                likes: 300_000,
                comments: 20_000,
                ..Default::default()
            },
            hashtags: hashtags.into_iter().map(|s| s.to_string()).collect(),
            mentions: vec![],
            posted_at: Some("2026-01-01".into()),
            viral_score: 0.0,
            viral_category: ViralCategory::Popular,
        }
    }

    #[test]
    fn youtube_post_gets_real_thumbnail_not_estimate() {
        let p = post(Platform::Youtube, "check it out", vec![]);
        let img = build_viral_image(&p, false).unwrap();
        assert!(!img.is_estimate);
        assert!(img.image_url.contains("img.youtube.com"));
    }

    #[test]
    fn non_youtube_post_falls_back_to_estimate() {
        let p = post(Platform::Instagram, "check it out", vec![]);
        let img = build_viral_image(&p, false).unwrap();
        assert!(img.is_estimate);
        assert_eq!(img.image_url, p.url);
    }

    #[test]
    fn fallback_suppressed_when_disabled() {
        let p = post(Platform::Instagram, "check it out", vec![]);
        assert!(build_viral_image(&p, true).is_none());
    }

    #[test]
    fn viral_indicators_detect_cta_urgency_and_hashtag_density() {
        let hashtags: Vec<String> = (0..6).map(|i| format!("#tag{i}")).collect();
        let indicators = viral_indicators("Link in bio! Last spots available, customers love it", &hashtags);
        assert!(indicators.iter().any(|i| i.contains("call-to-action")));
        assert!(indicators.iter().any(|i| i.contains("urgency")));
        assert!(indicators.iter().any(|i| i.contains("social-proof")));
        assert!(indicators.iter().any(|i| i.contains("hashtag density")));
    }
}
