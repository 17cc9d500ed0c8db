pub mod app_state;
pub mod config;
pub mod types;

pub use app_state::Orchestrator;

/// Current UTC instant formatted as RFC 3339 — the single place every
/// timestamped field in the artifact comes from, so tests can reason about
/// format without depending on `chrono`'s default `Display` impl elsewhere.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}
