//! Key Pool & Rotator (C1).
//!
//! Generalizes the `Arc<RwLock<Registry>>` + cooldown-timestamp pattern the
//! teacher crate used for IP-proxy selection (best-of latency/priority
//! scoring) to API-credential rotation. Unlike the proxy manager, selection
//! here is **strict round-robin** — never best-of scoring — because a
//! provider's ten keys are otherwise interchangeable and round-robin is the
//! only policy that guarantees even use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::core::types::FailureReason;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone)]
struct Credential {
    key: String,
    /// 0 = available. Any other value is a unix timestamp before which this
    /// credential must not be handed out.
    cooldown_until: u64,
    failure_count: u64,
}

/// Opaque identifier returned by `NextKey`, passed back to `MarkFailed`.
/// Encodes provider + index so `MarkFailed` doesn't need a second lookup
/// table; opaque to callers, who only ever round-trip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    provider_idx: usize,
    credential_idx: usize,
}

#[derive(Debug, Default)]
struct ProviderStats {
    rotations: u64,
    failures: u64,
    calls: u64,
}

struct ProviderPool {
    name: String,
    credentials: Vec<Credential>,
    cursor: usize,
    stats: ProviderStats,
}

/// Aggregate stats for `Stats()`, one entry per provider with at least one
/// registered credential.
#[derive(Debug, Clone)]
pub struct ProviderKeyStats {
    pub rotations: u64,
    pub failures: u64,
    pub calls: u64,
    pub active_count: usize,
    pub total_count: usize,
}

/// Thread-safe, provider-keyed credential rotator.
///
/// *Invariant*: a credential is never handed out while its cooldown is
/// active. *Lifecycle*: populated once at construction; afterwards only the
/// cursor advances and failures toggle cooldowns — the credential set itself
/// never changes. Cooldown clearing is lazy (checked at the next `next_key`
/// call for the provider) — no background task is required for correctness,
/// but `Stats()` also recomputes active counts on demand so it always
/// reflects current wall-clock reality.
pub struct KeyPool {
    providers: RwLock<Vec<ProviderPool>>,
    index_by_name: RwLock<HashMap<String, usize>>,
    default_cooldown: Duration,
    rotation_counter: AtomicU64,
}

impl KeyPool {
    pub fn new(default_cooldown: Duration) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            index_by_name: RwLock::new(HashMap::new()),
            default_cooldown,
            rotation_counter: AtomicU64::new(0),
        }
    }

    /// Register credentials for a provider. Safe to call with an empty
    /// `keys` vec — the provider then always reports `None` from `next_key`,
    /// which is how "zero credentials configured" is modeled.
    pub async fn register(&self, provider: &str, keys: Vec<String>) {
        let credentials = keys
            .into_iter()
            .map(|key| Credential {
                key,
                cooldown_until: 0,
                failure_count: 0,
            })
            .collect();

        let mut providers = self.providers.write().await;
        let mut index = self.index_by_name.write().await;
        if let Some(&idx) = index.get(provider) {
            providers[idx] = ProviderPool {
                name: provider.to_string(),
                credentials,
                cursor: 0,
                stats: ProviderStats::default(),
            };
        } else {
            index.insert(provider.to_string(), providers.len());
            providers.push(ProviderPool {
                name: provider.to_string(),
                credentials,
                cursor: 0,
                stats: ProviderStats::default(),
            });
        }
    }

    /// `NextKey(provider) → (key, handle) | none`.
    ///
    /// Round-robin within the provider; never falls back to a different
    /// provider — that decision belongs to the orchestrator, not C1.
    pub async fn next_key(&self, provider: &str) -> Option<(String, KeyHandle)> {
        let index = self.index_by_name.read().await;
        let provider_idx = *index.get(provider)?;
        drop(index);

        let mut providers = self.providers.write().await;
        let pool = &mut providers[provider_idx];
        if pool.credentials.is_empty() {
            return None;
        }

        let now = now_secs();
        let n = pool.credentials.len();
        for step in 0..n {
            let idx = (pool.cursor + step) % n;
            if pool.credentials[idx].cooldown_until <= now {
                pool.cursor = (idx + 1) % n;
                pool.stats.rotations += 1;
                pool.stats.calls += 1;
                self.rotation_counter.fetch_add(1, Ordering::Relaxed);
                let key = pool.credentials[idx].key.clone();
                return Some((
                    key,
                    KeyHandle {
                        provider_idx,
                        credential_idx: idx,
                    },
                ));
            }
        }
        // Every credential is cooling down — provider unavailable this run.
        None
    }

    /// `MarkFailed(handle, reason)` — disables the credential for the
    /// configured cooldown. All reasons currently trigger the same cooldown;
    /// the classification is retained purely for telemetry.
    pub async fn mark_failed(&self, handle: KeyHandle, reason: FailureReason) {
        let mut providers = self.providers.write().await;
        let Some(pool) = providers.get_mut(handle.provider_idx) else {
            return;
        };
        let Some(cred) = pool.credentials.get_mut(handle.credential_idx) else {
            return;
        };
        cred.cooldown_until = now_secs() + self.default_cooldown.as_secs();
        cred.failure_count += 1;
        pool.stats.failures += 1;
        tracing::warn!(
            provider = %pool.name,
            reason = reason.as_str(),
            failure_count = cred.failure_count,
            "credential marked failed; cooling down"
        );
    }

    /// `Stats() → {per-provider rotation count, failure count, active count}`.
    pub async fn stats(&self) -> HashMap<String, ProviderKeyStats> {
        let providers = self.providers.read().await;
        let now = now_secs();
        providers
            .iter()
            .map(|p| {
                let active = p.credentials.iter().filter(|c| c.cooldown_until <= now).count();
                (
                    p.name.clone(),
                    ProviderKeyStats {
                        rotations: p.stats.rotations,
                        failures: p.stats.failures,
                        calls: p.stats.calls,
                        active_count: active,
                        total_count: p.credentials.len(),
                    },
                )
            })
            .collect()
    }

    pub async fn has_provider(&self, provider: &str) -> bool {
        self.index_by_name.read().await.contains_key(provider)
    }
}

pub type SharedKeyPool = Arc<KeyPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_robin_returns_each_key_once_per_cycle() {
        let pool = KeyPool::new(Duration::from_secs(300));
        pool.register("exa", vec!["a".into(), "b".into(), "c".into()]).await;

        let mut seen = Vec::new();
        for _ in 0..3 {
            let (key, _) = pool.next_key("exa").await.unwrap();
            seen.push(key);
        }
        assert_eq!(seen, vec!["a".to_string(), "b".to_string(), "c".to_string()]);

        // Cycle repeats.
        let (key, _) = pool.next_key("exa").await.unwrap();
        assert_eq!(key, "a");
    }

    #[tokio::test]
    async fn failed_credential_is_skipped_until_cooldown_elapses() {
        let pool = KeyPool::new(Duration::from_secs(300));
        pool.register("serper", vec!["k1".into(), "k2".into()]).await;

        let (_, h1) = pool.next_key("serper").await.unwrap();
        pool.mark_failed(h1, FailureReason::RateLimit).await;

        let (key, _) = pool.next_key("serper").await.unwrap();
        assert_eq!(key, "k2");

        // k1 is cooling down — repeated calls keep landing on k2.
        let (key, _) = pool.next_key("serper").await.unwrap();
        assert_eq!(key, "k2");
    }

    #[tokio::test]
    async fn all_credentials_in_cooldown_yields_none() {
        let pool = KeyPool::new(Duration::from_secs(300));
        pool.register("firecrawl", vec!["only".into()]).await;
        let (_, h) = pool.next_key("firecrawl").await.unwrap();
        pool.mark_failed(h, FailureReason::Auth).await;
        assert!(pool.next_key("firecrawl").await.is_none());
    }

    #[tokio::test]
    async fn zero_credentials_yields_none_immediately() {
        let pool = KeyPool::new(Duration::from_secs(300));
        pool.register("unconfigured", vec![]).await;
        assert!(pool.next_key("unconfigured").await.is_none());
    }

    #[tokio::test]
    async fn stats_report_rotations_and_active_count() {
        let pool = KeyPool::new(Duration::from_secs(300));
        pool.register("youtube", vec!["a".into(), "b".into(), "c".into()]).await;
        let _ = pool.next_key("youtube").await;
        let _ = pool.next_key("youtube").await;

        let stats = pool.stats().await;
        let s = stats.get("youtube").unwrap();
        assert_eq!(s.rotations, 2);
        assert_eq!(s.active_count, 3);
        assert_eq!(s.total_count, 3);
    }
}
