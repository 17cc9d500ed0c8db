//! Viral Scorer & Identifier (C7).
//!
//! Per-platform engagement formulas producing a `[0, 10]` score, banded into
//! a `ViralCategory`. All inputs are parsed defensively elsewhere (the wire
//! types already default missing numeric fields to 0 — see
//! `PlatformMetrics`), so scoring here never has to guard against NaN or
//! negative counters.

use crate::core::types::{Platform, PlatformMetrics, SocialPost, ViralCategory};

/// Minimum score for a post to be considered "viral" at all. Items scoring
/// below this are still retained in aggregate stats but excluded from the
/// top-performers list used for capture.
pub const MIN_VIRAL_SCORE: f64 = 5.0;

/// `score(platform, metrics) → [0, 10]`, per the fixed formula table.
pub fn score(platform: Platform, metrics: &PlatformMetrics) -> f64 {
    let raw = match platform {
        Platform::Youtube => {
            metrics.views as f64 / 1000.0 + metrics.likes as f64 / 100.0 + metrics.comments as f64 / 10.0
        }
        Platform::Instagram | Platform::Facebook => {
            metrics.likes as f64 / 100.0 + metrics.comments as f64 / 10.0 + metrics.shares as f64 / 5.0
        }
        Platform::Twitter => {
            metrics.retweets as f64 / 10.0 + metrics.likes as f64 / 50.0 + metrics.replies as f64 / 5.0
        }
        Platform::Tiktok => {
            metrics.views as f64 / 10000.0 + metrics.likes as f64 / 500.0 + metrics.shares as f64 / 100.0
        }
        Platform::Linkedin => {
            // Not in the original formula table; treat as the
            // Instagram/Facebook engagement shape (likes/comments/shares),
            // the closest fit among the defined platforms.
            metrics.likes as f64 / 100.0 + metrics.comments as f64 / 10.0 + metrics.shares as f64 / 5.0
        }
    };

    let divisor = match platform {
        Platform::Youtube => 100.0,
        Platform::Instagram | Platform::Facebook | Platform::Linkedin => 50.0,
        Platform::Twitter => 20.0,
        Platform::Tiktok => 50.0,
    };

    (raw / divisor).min(10.0).max(0.0)
}

/// Generic-web scoring: `relevance_score × 10`, for items that arrive
/// as plain web results rather than platform posts.
pub fn score_generic_web(relevance_score: f64) -> f64 {
    (relevance_score * 10.0).clamp(0.0, 10.0)
}

/// Score a post in place, attaching `viral_score` and `viral_category`.
pub fn score_post(post: &mut SocialPost) {
    post.viral_score = score(post.platform, &post.metrics);
    post.viral_category = ViralCategory::from_score(post.viral_score);
}

/// `IdentifyViral(posts) → posts'`: score every post, keep those with
/// `score >= MIN_VIRAL_SCORE`, sorted descending by score.
pub fn identify_viral(posts: Vec<SocialPost>) -> Vec<SocialPost> {
    let mut scored: Vec<SocialPost> = posts
        .into_iter()
        .map(|mut p| {
            score_post(&mut p);
            p
        })
        .collect();
    scored.retain(|p| p.viral_score >= MIN_VIRAL_SCORE);
    scored.sort_by(|a, b| b.viral_score.partial_cmp(&a.viral_score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yt(views: u64, likes: u64, comments: u64) -> PlatformMetrics {
        PlatformMetrics {
            views,
            likes,
            comments,
            ..Default::default()
        }
    }

    // The spec's scenario-3 bands (POPULAR, TRENDING, VIRAL, MEGA_VIRAL for
    // these exact four metric tuples) are unreachable under §4.7's pinned
    // `/100` YouTube divisor: `(50_000, 500, 50)` raw-scores 60, i.e. 0.6
    // after the divisor, still POPULAR; and `(1_000_000, 20_000, 1_000)` /
    // `(10_000_000, 300_000, 20_000)` both raw-score past 1000 and clamp to
    // the same 10.0/MEGA_VIRAL. Asserting the scenario's literal bands here
    // would be asserting a formula the code doesn't implement, so this test
    // instead pins what the formula actually produces for these inputs.
    #[test]
    fn youtube_scoring_boundaries_match_pinned_formula() {
        let cases = [
            ((0, 0, 0), ViralCategory::Popular),
            ((50_000, 500, 50), ViralCategory::Popular),
            ((1_000_000, 20_000, 1_000), ViralCategory::MegaViral),
            ((10_000_000, 300_000, 20_000), ViralCategory::MegaViral),
        ];
        let mut prev = -1.0;
        for ((v, l, c), expected_cat) in cases {
            let s = score(Platform::Youtube, &yt(v, l, c));
            assert!(s >= prev, "score should never decrease: {s} vs {prev}");
            assert_eq!(ViralCategory::from_score(s), expected_cat);
            prev = s;
        }
    }

    #[test]
    fn score_is_clamped_to_ten() {
        let huge = yt(u64::MAX / 2, u64::MAX / 2, u64::MAX / 2);
        assert_eq!(score(Platform::Youtube, &huge), 10.0);
    }

    #[test]
    fn scoring_is_monotonic_in_each_metric() {
        let base = PlatformMetrics {
            likes: 1000,
            comments: 50,
            shares: 20,
            ..Default::default()
        };
        let mut bumped = base;
        bumped.likes += 500;
        assert!(score(Platform::Instagram, &bumped) >= score(Platform::Instagram, &base));
    }

    #[test]
    fn identify_viral_filters_and_sorts_descending() {
        let posts = vec![
            SocialPost {
                platform: Platform::Youtube,
                url: "https://youtube.com/watch?v=a".into(),
                title: "low".into(),
                description: String::new(),
                author: "a".into(),
                author_followers: None,
                metrics: yt(0, 0, 0),
                hashtags: vec![],
                mentions: vec![],
                posted_at: None,
                viral_score: 0.0,
                viral_category: ViralCategory::Popular,
            },
            SocialPost {
                platform: Platform::Youtube,
                url: "https://youtube.com/watch?v=b".into(),
                title: "high".into(),
                description: String::new(),
                author: "b".into(),
                author_followers: None,
                metrics: yt(10_000_000, 300_000, 20_000),
                hashtags: vec![],
                mentions: vec![],
                posted_at: None,
                viral_score: 0.0,
                viral_category: ViralCategory::Popular,
            },
        ];
        let viral = identify_viral(posts);
        assert_eq!(viral.len(), 1);
        assert_eq!(viral[0].title, "high");
    }

    #[test]
    fn generic_web_scoring_is_linear() {
        assert_eq!(score_generic_web(0.5), 5.0);
        assert_eq!(score_generic_web(2.0), 10.0);
    }
}
