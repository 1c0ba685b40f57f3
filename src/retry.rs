//! Mutation retry policy: classification-aware retries for remote writes
//!
//! Writes are user-initiated, so terminal outcomes must surface to the
//! caller: permission failures immediately (retrying cannot fix a missing
//! role), transient failures only after the backoff budget is spent, and in
//! both cases the final error is returned unchanged. A successful write
//! hands its topic to the cache purge exactly once, so "data changed" and
//! "resource pressure" funnel into the same consistency primitive.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use fieldfare_core_pressure::BackoffSchedule;

use crate::cache::{CacheStore, Topic};
use crate::error::Result;
use crate::notify::{NoticeLevel, NotificationSink};

/// Wraps remote write operations with bounded, classified retries.
pub struct MutationRetryPolicy {
    schedule: BackoffSchedule,
    cache: CacheStore,
    sink: Arc<dyn NotificationSink>,
}

impl MutationRetryPolicy {
    pub fn new(
        schedule: BackoffSchedule,
        cache: CacheStore,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            schedule,
            cache,
            sink,
        }
    }

    /// Execute a write operation under the retry policy.
    ///
    /// `operation` is re-invoked for each attempt, so it must be idempotent
    /// against the remote actor. On success the partitions mapped to
    /// `topic` are purged before the result is returned.
    pub async fn execute<T, F, Fut>(&self, topic: Topic, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            match operation().await {
                Ok(value) => {
                    debug!(topic = %topic, attempts, "mutation succeeded");
                    self.cache.purge_for_mutation(topic).await;
                    return Ok(value);
                }
                Err(e) if e.is_permission() => {
                    // Terminal: a missing role does not heal with retries.
                    warn!(topic = %topic, error = %e, "mutation rejected: permission denied");
                    self.sink.notify(
                        NoticeLevel::Error,
                        &format!("save failed: {}", e),
                        Duration::from_secs(8),
                    );
                    return Err(e);
                }
                Err(e) if e.is_transient() && self.schedule.allows_retry(attempts) => {
                    let delay = self.schedule.delay_for(attempts - 1);
                    warn!(
                        topic = %topic,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "mutation failed; retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(
                            topic = %topic,
                            attempts,
                            error = %e,
                            "mutation failed; retry budget exhausted"
                        );
                        self.sink.notify(
                            NoticeLevel::Error,
                            &format!("save failed after {} attempts: {}", attempts, e),
                            Duration::from_secs(8),
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, Partition};
    use crate::error::FieldfareError;
    use crate::notify::RecordingSink;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> (MutationRetryPolicy, CacheStore, Arc<RecordingSink>) {
        let cache = CacheStore::new();
        let sink = Arc::new(RecordingSink::new());
        let schedule = BackoffSchedule {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            max_attempts,
        };
        (
            MutationRetryPolicy::new(
                schedule,
                cache.clone(),
                sink.clone() as Arc<dyn NotificationSink>,
            ),
            cache,
            sink,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_purges_topic_once() {
        let (policy, cache, _sink) = policy(5);
        cache
            .insert_fresh(&CacheKey::of(Partition::SpeciesList), json!(["stale"]))
            .await;
        cache
            .insert_fresh(&CacheKey::of(Partition::TeamRoster), json!(["ada"]))
            .await;

        let result = policy
            .execute(Topic::Species, || async { Ok(json!("saved")) })
            .await
            .unwrap();
        assert_eq!(result, json!("saved"));

        assert_eq!(cache.entry_count(Partition::SpeciesList).await, 0);
        // Unmapped partitions untouched.
        assert_eq!(cache.entry_count(Partition::TeamRoster).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_failure_attempted_exactly_once() {
        let (policy, cache, sink) = policy(5);
        cache
            .insert_fresh(&CacheKey::of(Partition::SpeciesList), json!(["keep"]))
            .await;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let err = policy
            .execute(Topic::Species, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(FieldfareError::PermissionDenied("editor role required".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_permission());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // No purge on failure.
        assert_eq!(cache.entry_count(Partition::SpeciesList).await, 1);
        assert_eq!(sink.count_at(NoticeLevel::Error), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_succeeds_on_third_attempt() {
        let (policy, cache, sink) = policy(5);
        cache
            .insert_fresh(&CacheKey::of(Partition::SpeciesDetail), json!("old"))
            .await;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let result = policy
            .execute(Topic::Species, move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(FieldfareError::Transport("connection reset".into()))
                    } else {
                        Ok(json!("saved"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, json!("saved"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Purge ran exactly once, on final success.
        assert_eq!(cache.entry_count(Partition::SpeciesDetail).await, 0);
        assert_eq!(sink.count_at(NoticeLevel::Error), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_final_error() {
        let (policy, cache, sink) = policy(5);
        cache
            .insert_fresh(&CacheKey::of(Partition::SpeciesList), json!(["keep"]))
            .await;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let err = policy
            .execute(Topic::Species, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(FieldfareError::Transport("gateway timeout".into()))
                }
            })
            .await
            .unwrap_err();

        // Exactly the attempt cap, and the caller gets the final error as-is.
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert!(matches!(err, FieldfareError::Transport(ref m) if m == "gateway timeout"));
        assert_eq!(cache.entry_count(Partition::SpeciesList).await, 1);
        assert_eq!(sink.count_at(NoticeLevel::Error), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_not_retried_and_silent() {
        let (policy, _cache, sink) = policy(5);

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let err = policy
            .execute(Topic::Media, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(FieldfareError::Remote("schema mismatch".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FieldfareError::Remote(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // Not a retry exhaustion: no user-facing notice.
        assert_eq!(sink.count_at(NoticeLevel::Error), 0);
    }
}
