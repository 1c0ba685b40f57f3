//! Recovery controller: the debounced response to critical pressure
//!
//! A recovery pass is a best-effort, side-effecting broadcast, not a
//! transaction: every registered subscriber is invoked, a failing subscriber
//! is logged and isolated so it cannot block the rest, the volatile cache
//! partitions are cleared, and a single completion event fires exactly once
//! per session no matter how many callbacks ran or failed.
//!
//! Admission is gated twice: an in-progress flag guarantees sessions never
//! overlap, and a cooldown between session starts throttles frequency when
//! usage hovers at the critical line. An ineligible critical observation is
//! logged and produces no action — that is the back-pressure mechanism, by
//! construction rather than by queueing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use fieldfare_core_pressure::{GateDecision, RecoveryGate};

use crate::cache::{CacheStore, Partition};
use crate::notify::{NoticeLevel, NotificationSink};
use crate::subscribers::SubscriberRegistry;

/// Hook invoked once per completed recovery session.
pub type CompletionHook = dyn Fn() + Send + Sync;

/// Counters describing recovery activity since construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Sessions that ran to completion
    pub sessions_completed: u64,
    /// Critical observations rejected by the gate
    pub observations_skipped: u64,
    /// Individual subscriber callbacks that returned an error
    pub subscriber_failures: u64,
}

/// Coordinates recovery sessions: gate, subscriber broadcast, volatile
/// cache purge, completion event.
pub struct RecoveryController {
    enabled: bool,
    gate: Mutex<RecoveryGate>,
    registry: Arc<SubscriberRegistry>,
    cache: CacheStore,
    sink: Arc<dyn NotificationSink>,
    on_complete: Mutex<Option<Box<CompletionHook>>>,
    sessions_completed: AtomicU64,
    observations_skipped: AtomicU64,
    subscriber_failures: AtomicU64,
}

impl RecoveryController {
    pub fn new(
        enabled: bool,
        min_recovery_interval: Duration,
        registry: Arc<SubscriberRegistry>,
        cache: CacheStore,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            enabled,
            gate: Mutex::new(RecoveryGate::new(min_recovery_interval)),
            registry,
            cache,
            sink,
            on_complete: Mutex::new(None),
            sessions_completed: AtomicU64::new(0),
            observations_skipped: AtomicU64::new(0),
            subscriber_failures: AtomicU64::new(0),
        }
    }

    /// Install a hook fired once per completed session, after the purge.
    pub fn set_on_complete<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_complete.lock().expect("hook lock poisoned") = Some(Box::new(hook));
    }

    /// React to one critical pressure observation.
    ///
    /// Returns `true` if a recovery session ran. All four admission
    /// conditions are required: critical severity (the caller's business),
    /// auto-recovery enabled, no session in progress, cooldown elapsed.
    pub async fn observe_critical(&self, usage_pct: f64) -> bool {
        if !self.enabled {
            debug!(usage_pct, "critical pressure observed but auto-recovery is disabled");
            self.observations_skipped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Check-and-arm happens atomically under the gate lock; the
        // in-progress flag stays set across the await points below.
        let decision = {
            let mut gate = self.gate.lock().expect("gate lock poisoned");
            gate.try_begin(Instant::now())
        };

        match decision {
            GateDecision::Begin => {}
            GateDecision::InProgress => {
                debug!(usage_pct, "recovery already in progress; observation ignored");
                self.observations_skipped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            GateDecision::CoolingDown { remaining } => {
                debug!(
                    usage_pct,
                    remaining_ms = remaining.as_millis() as u64,
                    "recovery cooling down; observation ignored"
                );
                self.observations_skipped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        self.run_session(usage_pct).await;
        true
    }

    /// Execute one admitted session. The gate is already armed.
    async fn run_session(&self, usage_pct: f64) {
        info!(usage_pct, "starting recovery session");

        let subscribers = self.registry.snapshot();
        let mut failures = 0u64;
        for (id, callback) in &subscribers {
            if let Err(e) = callback() {
                // One bad subscriber must not block the others.
                warn!(subscriber = id, error = %e, "recovery subscriber failed");
                failures += 1;
            }
        }
        if failures > 0 {
            self.subscriber_failures.fetch_add(failures, Ordering::Relaxed);
        }

        self.cache.hard_clear(&Partition::VOLATILE).await;

        // Exactly one completion event per session, regardless of how many
        // callbacks ran or failed.
        self.sink.notify(
            NoticeLevel::Success,
            "memory recovered: cached media released",
            Duration::from_secs(4),
        );
        if let Some(hook) = self
            .on_complete
            .lock()
            .expect("hook lock poisoned")
            .as_ref()
        {
            hook();
        }

        self.gate.lock().expect("gate lock poisoned").complete();
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            subscribers = subscribers.len(),
            failures, "recovery session complete"
        );
    }

    /// Whether a session is currently running.
    pub fn in_progress(&self) -> bool {
        self.gate.lock().expect("gate lock poisoned").in_progress()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> RecoveryStats {
        RecoveryStats {
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            observations_skipped: self.observations_skipped.load(Ordering::Relaxed),
            subscriber_failures: self.subscriber_failures.load(Ordering::Relaxed),
        }
    }
}
