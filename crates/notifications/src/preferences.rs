//! Per-user notification preferences, cached with a short TTL (§4.2) so the
//! terminal-state fan-out path doesn't round-trip to the durable store for
//! every job.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[async_trait::async_trait]
pub trait PreferencesSource: Send + Sync {
    /// Whether `user_id` wants terminal-job emails. Infrastructure failures
    /// reading the preference should be treated as "disabled" by the
    /// caller rather than blocking the notification path (§4.2, §7).
    async fn email_enabled(&self, user_id: uuid::Uuid) -> anyhow::Result<bool>;
}

struct CacheEntry {
    value: bool,
    fetched_at: Instant,
}

/// Wraps a `PreferencesSource` with an in-memory TTL cache.
pub struct CachedPreferences<S> {
    source: S,
    ttl: Duration,
    cache: Mutex<HashMap<uuid::Uuid, CacheEntry>>,
}

impl<S: PreferencesSource> CachedPreferences<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn email_enabled(&self, user_id: uuid::Uuid) -> bool {
        if let Some(entry) = self.cache.lock().unwrap().get(&user_id) {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.value;
            }
        }

        let value = match self.source.email_enabled(user_id).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "failed to read notification preferences, treating as disabled");
                false
            }
        };

        self.cache.lock().unwrap().insert(
            user_id,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        value: bool,
    }

    #[async_trait::async_trait]
    impl PreferencesSource for CountingSource {
        async fn email_enabled(&self, _user_id: uuid::Uuid) -> anyhow::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    #[tokio::test]
    async fn caches_within_ttl() {
        let cached = CachedPreferences::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                value: true,
            },
            Duration::from_secs(60),
        );
        let user = uuid::Uuid::new_v4();
        assert!(cached.email_enabled(user).await);
        assert!(cached.email_enabled(user).await);
        assert_eq!(cached.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let cached = CachedPreferences::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                value: true,
            },
            Duration::from_millis(1),
        );
        let user = uuid::Uuid::new_v4();
        cached.email_enabled(user).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cached.email_enabled(user).await;
        assert_eq!(cached.source.calls.load(Ordering::SeqCst), 2);
    }
}
