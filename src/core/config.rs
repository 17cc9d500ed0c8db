//! File-based config loader (`viral-scout.json`) with env-var fallback.
//!
//! Resolution order for every knob: JSON field → environment variable →
//! hardcoded default. A missing file or a parse error never aborts
//! startup — it just falls through to env vars and then defaults.

use std::path::Path;
use std::time::Duration;

/// Every configuration knob this crate exposes. All fields optional in the
/// JSON file; every accessor below has an env-var and a hardcoded fallback.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ViralScoutFileConfig {
    pub max_pages: Option<usize>,
    pub depth_levels: Option<u8>,
    pub max_images_per_platform: Option<usize>,
    pub min_image_bytes: Option<u64>,
    pub min_quality_score: Option<f64>,
    pub min_viral_score_for_capture: Option<f64>,
    pub key_cooldown_seconds: Option<u64>,
    pub study_minutes: Option<u64>,
    pub enable_screenshots: Option<bool>,
    pub enable_image_downloads: Option<bool>,
    pub enable_trends: Option<bool>,
    pub disable_fallbacks: Option<bool>,
    pub enable_deep_study: Option<bool>,
    pub sessions_root: Option<String>,
    pub images_root: Option<String>,
    pub screenshots_root: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
}

/// Load `viral-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `./viral-scout.json` (process cwd)
/// 2. `../viral-scout.json` (one level up, for running from a nested crate dir)
/// 3. `VIRAL_SCOUT_CONFIG` env var path
///
/// Missing file → `ViralScoutFileConfig::default()` (silent, all env-var
/// fallbacks apply). Parse error → log a warning, return default.
pub fn load_file_config() -> ViralScoutFileConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("viral-scout.json"),
            std::path::PathBuf::from("../viral-scout.json"),
        ];
        if let Ok(env_path) = std::env::var("VIRAL_SCOUT_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ViralScoutFileConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("viral-scout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "viral-scout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ViralScoutFileConfig::default();
                }
            },
            Err(_) => continue,
        }
    }

    ViralScoutFileConfig::default()
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Err(_) => default,
        Ok(v) => {
            let v = v.trim().to_ascii_lowercase();
            if v.is_empty() {
                default
            } else {
                matches!(v.as_str(), "1" | "true" | "yes" | "on")
            }
        }
    }
}

/// Resolved runtime configuration — the result of merging `ViralScoutFileConfig`
/// with env vars and defaults once at startup, so the rest of the crate reads
/// plain fields instead of re-resolving on every call.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_pages: usize,
    pub depth_levels: u8,
    pub max_images_per_platform: usize,
    pub min_image_bytes: u64,
    pub min_quality_score: f64,
    pub min_viral_score_for_capture: f64,
    pub key_cooldown: Duration,
    pub study_minutes: u64,
    pub enable_screenshots: bool,
    pub enable_image_downloads: bool,
    pub enable_trends: bool,
    pub disable_fallbacks: bool,
    pub enable_deep_study: bool,
    pub sessions_root: String,
    pub images_root: String,
    pub screenshots_root: String,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl Settings {
    pub fn load() -> Self {
        let file = load_file_config();

        let max_pages = file
            .max_pages
            .or_else(|| env_parse("MAX_PAGES"))
            .unwrap_or(30);
        let depth_levels = file
            .depth_levels
            .or_else(|| env_parse("DEPTH_LEVELS"))
            .unwrap_or(3)
            .clamp(1, 3);
        let max_images_per_platform = file
            .max_images_per_platform
            .or_else(|| env_parse("MAX_IMAGES_PER_PLATFORM"))
            .unwrap_or(10);
        let min_image_bytes = file
            .min_image_bytes
            .or_else(|| env_parse("MIN_IMAGE_BYTES"))
            .unwrap_or(10 * 1024);
        let min_quality_score = file
            .min_quality_score
            .or_else(|| env_parse("MIN_QUALITY_SCORE"))
            .unwrap_or(60.0);
        let min_viral_score_for_capture = file
            .min_viral_score_for_capture
            .or_else(|| env_parse("MIN_VIRAL_SCORE_FOR_CAPTURE"))
            .unwrap_or(5.0);
        let key_cooldown_seconds = file
            .key_cooldown_seconds
            .or_else(|| env_parse("KEY_COOLDOWN_SECONDS"))
            .unwrap_or(300);
        let study_minutes = file
            .study_minutes
            .or_else(|| env_parse("STUDY_MINUTES"))
            .unwrap_or(5);

        Self {
            max_pages,
            depth_levels,
            max_images_per_platform,
            min_image_bytes,
            min_quality_score,
            min_viral_score_for_capture,
            key_cooldown: Duration::from_secs(key_cooldown_seconds),
            study_minutes,
            enable_screenshots: file.enable_screenshots.unwrap_or_else(|| env_bool("ENABLE_SCREENSHOTS", true)),
            enable_image_downloads: file
                .enable_image_downloads
                .unwrap_or_else(|| env_bool("ENABLE_IMAGE_DOWNLOADS", true)),
            enable_trends: file.enable_trends.unwrap_or_else(|| env_bool("ENABLE_TRENDS", true)),
            disable_fallbacks: file
                .disable_fallbacks
                .unwrap_or_else(|| env_bool("DISABLE_FALLBACKS", false)),
            enable_deep_study: file
                .enable_deep_study
                .unwrap_or_else(|| env_bool("ENABLE_DEEP_STUDY", false)),
            sessions_root: file
                .sessions_root
                .or_else(|| env_str("SESSIONS_ROOT"))
                .unwrap_or_else(|| "sessions".to_string()),
            images_root: file
                .images_root
                .or_else(|| env_str("IMAGES_ROOT"))
                .unwrap_or_else(|| "images".to_string()),
            screenshots_root: file
                .screenshots_root
                .or_else(|| env_str("SCREENSHOTS_ROOT"))
                .unwrap_or_else(|| "screenshots".to_string()),
            llm_base_url: file
                .llm_base_url
                .or_else(|| env_str("OPENAI_BASE_URL"))
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            llm_api_key: file.llm_api_key.or_else(|| env_str("OPENAI_API_KEY")),
            llm_model: file
                .llm_model
                .or_else(|| env_str("VIRAL_SCOUT_LLM_MODEL"))
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-provider credential discovery
// ---------------------------------------------------------------------------

/// Discover every credential configured for `provider_env_prefix`.
///
/// Recognizes `{PREFIX}_API_KEY` as the primary credential, plus numbered
/// siblings `{PREFIX}_API_KEY_1`, `{PREFIX}_API_KEY_2`, … up to the first gap.
/// All discovered keys enter the same pool.
pub fn discover_provider_keys(provider_env_prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(primary) = env_str(&format!("{provider_env_prefix}_API_KEY")) {
        keys.push(primary);
    }
    let mut n = 1;
    loop {
        match env_str(&format!("{provider_env_prefix}_API_KEY_{n}")) {
            Some(k) => {
                keys.push(k);
                n += 1;
            }
            None => break,
        }
    }
    keys
}

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Optional override for the Chromium-family browser executable. Default
/// behavior is auto-discovery (`capture::browser::find_chrome_executable`).
pub fn chrome_executable_override() -> Option<String> {
    let p = env_str(ENV_CHROME_EXECUTABLE)?;
    if Path::new(&p).exists() {
        Some(p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_and_file_absent() {
        // This test assumes a clean env; it only checks that defaults are sane,
        // not that they match any particular pre-set environment.
        let file = ViralScoutFileConfig::default();
        assert!(file.max_pages.is_none());
    }

    #[test]
    fn discover_provider_keys_stops_at_first_gap() {
        std::env::set_var("TESTPROV_API_KEY", "primary");
        std::env::set_var("TESTPROV_API_KEY_1", "second");
        std::env::remove_var("TESTPROV_API_KEY_2");
        std::env::set_var("TESTPROV_API_KEY_3", "should_not_appear");

        let keys = discover_provider_keys("TESTPROV");
        assert_eq!(keys, vec!["primary".to_string(), "second".to_string()]);

        std::env::remove_var("TESTPROV_API_KEY");
        std::env::remove_var("TESTPROV_API_KEY_1");
        std::env::remove_var("TESTPROV_API_KEY_3");
    }
}
