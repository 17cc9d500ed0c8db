//! Wire-level data model for a collection run.
//!
//! Every type here is `Serialize`/`Deserialize` because it either ends up in
//! `massive_data.json` verbatim or is a parameter/return value crossing a
//! component boundary. Tagged sum types replace the duck-typed dicts the
//! Python original passed around: a caller can always match exhaustively
//! instead of probing for keys that may or may not be present.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Context ──────────────────────────────────────────────────────────────

/// Free-form campaign context. `segment`/`product`/`audience` are promoted to
/// first-class fields because C5 and C6 read them by name constantly; any
/// other caller-supplied key survives in `extra` instead of being dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Context {
    /// The context terms C5 counts for the "context-term overlap" signal:
    /// segment, product, and audience, lower-cased, empty/whitespace-only
    /// entries dropped.
    pub fn overlap_terms(&self) -> Vec<String> {
        [&self.segment, &self.product, &self.audience]
            .into_iter()
            .filter_map(|v| v.as_ref())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ── Key pool ─────────────────────────────────────────────────────────────

/// Classification attached to a failure for telemetry. All reasons currently
/// trigger the same cooldown; callers still pass the real reason so stats and
/// the Markdown "Errors" section can say *why* a provider went dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Auth,
    RateLimit,
    ServerError,
    Network,
    Other,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Auth => "auth",
            FailureReason::RateLimit => "rate_limit",
            FailureReason::ServerError => "server_error",
            FailureReason::Network => "network",
            FailureReason::Other => "other",
        }
    }
}

// ── Search / extraction ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source_provider: String,
    pub relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    pub title: String,
    pub content_text: String,
    pub quality_score: f64,
    pub insights: Vec<String>,
    pub is_preferred_source: bool,
    pub word_count: usize,
    pub extraction_method: String,
    pub extracted_at: String,
    /// Which C2 client originally surfaced this URL. Not in the distilled
    /// wire contract's minimal shape but needed to populate `SourceDetail`
    /// without a second lookup table; always present for pages produced by
    /// C6, `None` only if constructed synthetically (e.g. in tests).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_provider: Option<String>,
}

// ── Social / viral ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Facebook,
    Twitter,
    Tiktok,
    Linkedin,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
        }
    }
}

/// Engagement metrics, tagged by platform family. Fields absent from a
/// provider payload default to 0 rather than making the whole post optional.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlatformMetrics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub quotes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViralCategory {
    Popular,
    Trending,
    Viral,
    MegaViral,
}

impl ViralCategory {
    /// Band assignment per the fixed score thresholds. `score` must already
    /// be clamped to `[0, 10]`.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            ViralCategory::MegaViral
        } else if score >= 7.0 {
            ViralCategory::Viral
        } else if score >= 5.0 {
            ViralCategory::Trending
        } else {
            ViralCategory::Popular
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: Platform,
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_followers: Option<u64>,
    pub metrics: PlatformMetrics,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
    pub viral_score: f64,
    pub viral_category: ViralCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementEstimate {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViralImage {
    pub image_url: String,
    pub post_url: String,
    pub platform: Platform,
    pub title: String,
    pub description: String,
    pub engagement_score: f64,
    pub estimates: EngagementEstimate,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_local_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_local_path: Option<String>,
    pub quality_score: f64,
    pub viral_indicators: Vec<String>,
    /// Set when the conservative fallback fired instead of a real
    /// extraction-tool payload. Never true when `DISABLE_FALLBACKS` is set.
    #[serde(default)]
    pub is_estimate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub word_count: usize,
    pub has_video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub relative_path: String,
    pub absolute_path: String,
    pub source_url: String,
    pub final_url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viral_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viral_category: Option<ViralCategory>,
    pub captured_at: String,
    pub file_size_bytes: u64,
    pub content_metrics: ContentMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalImage {
    pub local_path: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viral_score: Option<f64>,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub downloaded_at: String,
}

// ── Provider response envelope ───────────────────────────────────────────

/// Every provider call returns one of these instead of a bare `Result`, so a
/// caller can tell "nothing to report" (soft failure — all keys cooling down,
/// empty body) apart from "the transport broke" (hard failure) without
/// parsing an error string.
#[derive(Debug, Clone)]
pub enum ProviderResponse<T> {
    Success(Vec<T>),
    SoftFailure { reason: String },
    HardFailure { reason: String },
}

impl<T> ProviderResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ProviderResponse::Success(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResponse::Success(_))
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ProviderResponse::SoftFailure { reason } | ProviderResponse::HardFailure { reason } => {
                Some(reason.as_str())
            }
            ProviderResponse::Success(_) => None,
        }
    }
}

/// `{success, error?, data}` wrapper used for every optional top-level
/// `MassiveData` section, matching the wire contract downstream consumers
/// depend on: absent, or present with `success` and an optional `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: T,
}

impl<T> SectionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    pub fn failed(error: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformBucket {
    pub posts: Vec<SocialPost>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for PlatformBucket {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            success: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialMediaData {
    pub platforms: HashMap<String, PlatformBucket>,
}

// ── Research (C6) ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDetail {
    pub url: String,
    pub title: String,
    pub quality_score: f64,
    pub source_provider: String,
    pub is_preferred_source: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchData {
    pub top_insights: Vec<String>,
    pub trends: Vec<String>,
    pub opportunities: Vec<String>,
    pub sources: Vec<SourceDetail>,
    #[serde(default)]
    pub emergency_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_reason: Option<String>,
}

/// Marker embedded whenever a phase or the whole run cannot complete
/// normally; downstream consumers must detect and degrade gracefully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRecord {
    pub emergency_mode: bool,
    pub reason: String,
    pub occurred_at: String,
}

impl EmergencyRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            emergency_mode: true,
            reason: reason.into(),
            occurred_at: crate::core::now_iso8601(),
        }
    }
}

// ── Deep study (C11) ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpertKnowledge {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic: Option<String>,
    /// Subsection names that hit their per-phase timeout. The run continues;
    /// these fields are simply absent above.
    pub incomplete_sections: Vec<String>,
}

// ── Stats & top-level artifact ───────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_sources: usize,
    pub unique_urls: usize,
    pub total_content_chars: usize,
    pub api_calls_per_provider: HashMap<String, u64>,
    pub api_rotations_per_provider: HashMap<String, u64>,
    pub screenshots_captured: usize,
    pub collection_duration_seconds: f64,
    pub success_rate_per_provider: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassiveData {
    pub session_id: String,
    pub query: String,
    pub context: Context,
    pub collection_started: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_ended: Option<String>,

    pub web_search_data: SectionResult<Vec<SearchResult>>,
    pub social_media_data: SectionResult<SocialMediaData>,
    pub trends_data: SectionResult<Vec<String>>,
    pub viral_content: SectionResult<Vec<ViralImage>>,
    pub screenshots_captured: SectionResult<Vec<Screenshot>>,
    pub extracted_content: Vec<ExtractedPage>,
    pub research: ResearchData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_knowledge: Option<ExpertKnowledge>,

    pub statistics: Stats,

    #[serde(default)]
    pub emergency_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<EmergencyRecord>,
}

impl MassiveData {
    /// The degenerate artifact produced on a hard failure: every section
    /// present but empty, `emergency_mode` set, human-readable reason
    /// attached. Callers always get *a* `MassiveData`, never a raw error.
    pub fn emergency(session_id: String, query: String, context: Context, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let now = crate::core::now_iso8601();
        Self {
            session_id,
            query,
            context,
            collection_started: now.clone(),
            collection_ended: Some(now),
            web_search_data: SectionResult::failed(reason.clone(), Vec::new()),
            social_media_data: SectionResult::failed(reason.clone(), SocialMediaData::default()),
            trends_data: SectionResult::failed(reason.clone(), Vec::new()),
            viral_content: SectionResult::failed(reason.clone(), Vec::new()),
            screenshots_captured: SectionResult::failed(reason.clone(), Vec::new()),
            extracted_content: Vec::new(),
            research: ResearchData {
                emergency_mode: true,
                emergency_reason: Some(reason.clone()),
                ..Default::default()
            },
            expert_knowledge: None,
            statistics: Stats::default(),
            emergency_mode: true,
            emergency: Some(EmergencyRecord::new(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viral_category_bands() {
        assert_eq!(ViralCategory::from_score(0.0), ViralCategory::Popular);
        assert_eq!(ViralCategory::from_score(4.99), ViralCategory::Popular);
        assert_eq!(ViralCategory::from_score(5.0), ViralCategory::Trending);
        assert_eq!(ViralCategory::from_score(6.99), ViralCategory::Trending);
        assert_eq!(ViralCategory::from_score(7.0), ViralCategory::Viral);
        assert_eq!(ViralCategory::from_score(8.99), ViralCategory::Viral);
        assert_eq!(ViralCategory::from_score(9.0), ViralCategory::MegaViral);
        assert_eq!(ViralCategory::from_score(10.0), ViralCategory::MegaViral);
    }

    #[test]
    fn context_overlap_terms_skip_blank_and_lowercase() {
        let ctx = Context {
            segment: Some(" Telemedicina ".into()),
            product: Some("".into()),
            audience: None,
            extra: Default::default(),
        };
        assert_eq!(ctx.overlap_terms(), vec!["telemedicina".to_string()]);
    }

    #[test]
    fn emergency_artifact_flags_every_section() {
        let data = MassiveData::emergency(
            "sess-1".into(),
            "q".into(),
            Context::default(),
            "storage root unwritable",
        );
        assert!(data.emergency_mode);
        assert!(!data.web_search_data.success);
        assert!(!data.social_media_data.success);
        assert!(data.extracted_content.is_empty());
    }
}
