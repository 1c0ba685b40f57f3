//! Resource monitor: periodic sampling, classification, dispatch
//!
//! The monitor owns the sampling timer. Each tick pulls one snapshot from
//! the metrics source; an absent snapshot skips classification entirely (no
//! severity is manufactured from missing data) and never stops the timer.
//! Present snapshots are classified and dispatched: the sample hook fires,
//! severity *transitions* are pushed to the notification sink, and critical
//! severity is handed to the recovery controller, which applies its own
//! admission gating.
//!
//! `start` and `stop` are both idempotent. After `stop` returns, no further
//! sample fires; a tick already past its admission check finishes its work
//! (recovery callbacks are fast synchronous side effects and are never
//! cancelled mid-flight).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fieldfare_core_pressure::{classify, MemoryStats, PressureThresholds, Severity};

use crate::config::MonitorSettings;
use crate::error::Result;
use crate::metrics::MetricsSource;
use crate::notify::{NoticeLevel, NotificationSink};
use crate::recovery::RecoveryController;

/// Hook invoked with every present sample and its classification.
pub type SampleHook = dyn Fn(&MemoryStats, Severity) + Send + Sync;

/// Counters describing monitor activity since construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Ticks that produced a classified sample
    pub samples_taken: u64,
    /// Ticks skipped because the source reported absent
    pub samples_skipped: u64,
    /// Samples classified Warning
    pub warnings_observed: u64,
    /// Samples classified Critical
    pub criticals_observed: u64,
    /// Recovery sessions started from this monitor's observations
    pub recoveries_started: u64,
}

struct MonitorInner {
    interval: Duration,
    thresholds: PressureThresholds,
    source: Arc<dyn MetricsSource>,
    recovery: Arc<RecoveryController>,
    sink: Arc<dyn NotificationSink>,
    on_sample: Mutex<Option<Box<SampleHook>>>,
    last_severity: Mutex<Option<Severity>>,
    samples_taken: AtomicU64,
    samples_skipped: AtomicU64,
    warnings_observed: AtomicU64,
    criticals_observed: AtomicU64,
    recoveries_started: AtomicU64,
}

impl MonitorInner {
    async fn tick(&self) {
        let Some(stats) = self.source.sample() else {
            // Absent telemetry for this tick: no classification, no action.
            self.samples_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("memory sample unavailable; skipping tick");
            return;
        };

        let severity = classify(stats.usage_percentage, &self.thresholds);
        self.samples_taken.fetch_add(1, Ordering::Relaxed);
        debug!(
            used = stats.used_bytes,
            limit = stats.limit_bytes,
            usage_pct = stats.usage_percentage,
            severity = %severity,
            "memory sampled"
        );

        match severity {
            Severity::Warning => {
                self.warnings_observed.fetch_add(1, Ordering::Relaxed);
            }
            Severity::Critical => {
                self.criticals_observed.fetch_add(1, Ordering::Relaxed);
            }
            Severity::Normal => {}
        }

        if let Some(hook) = self.on_sample.lock().expect("hook lock poisoned").as_ref() {
            hook(&stats, severity);
        }

        self.notify_transition(severity, stats.usage_percentage);

        if severity == Severity::Critical {
            warn!(
                usage_pct = stats.usage_percentage,
                "critical memory pressure observed"
            );
            if self.recovery.observe_critical(stats.usage_percentage).await {
                self.recoveries_started.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Push a notice when the severity changes; a stable severity stays
    /// quiet (the log still records every sample).
    fn notify_transition(&self, severity: Severity, usage_pct: f64) {
        let previous = self
            .last_severity
            .lock()
            .expect("severity lock poisoned")
            .replace(severity);
        if previous == Some(severity) {
            return;
        }

        match severity {
            Severity::Warning => self.sink.notify(
                NoticeLevel::Warning,
                &format!("memory usage elevated: {:.1}%", usage_pct),
                Duration::from_secs(6),
            ),
            Severity::Critical => self.sink.notify(
                NoticeLevel::Error,
                &format!("memory usage critical: {:.1}%", usage_pct),
                Duration::from_secs(8),
            ),
            Severity::Normal => {}
        }
    }
}

/// State of one sampling run; replaced wholesale on every start so a
/// draining previous run can never interfere with a fresh one.
struct RunState {
    task: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

/// Periodic memory-pressure monitor.
///
/// One explicit instance per application session, injected into whatever
/// owns the session lifetime; unit tests construct as many independent
/// instances as they like.
pub struct ResourceMonitor {
    inner: Arc<MonitorInner>,
    run: Mutex<Option<RunState>>,
}

impl ResourceMonitor {
    /// Build a monitor. Settings are validated here and immutable afterward;
    /// reconfiguring means constructing a new monitor.
    pub fn new(
        settings: &MonitorSettings,
        source: Arc<dyn MetricsSource>,
        recovery: Arc<RecoveryController>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            inner: Arc::new(MonitorInner {
                interval: settings.check_interval(),
                thresholds: settings.thresholds(),
                source,
                recovery,
                sink,
                on_sample: Mutex::new(None),
                last_severity: Mutex::new(None),
                samples_taken: AtomicU64::new(0),
                samples_skipped: AtomicU64::new(0),
                warnings_observed: AtomicU64::new(0),
                criticals_observed: AtomicU64::new(0),
                recoveries_started: AtomicU64::new(0),
            }),
            run: Mutex::new(None),
        })
    }

    /// Install a hook observing every classified sample.
    pub fn set_on_sample<F>(&self, hook: F)
    where
        F: Fn(&MemoryStats, Severity) + Send + Sync + 'static,
    {
        *self
            .inner
            .on_sample
            .lock()
            .expect("hook lock poisoned") = Some(Box::new(hook));
    }

    /// Begin periodic sampling. Calling on a running monitor is a no-op.
    pub fn start(&self) {
        let mut slot = self.run.lock().expect("run lock poisoned");
        if slot.as_ref().is_some_and(|run| !run.task.is_finished()) {
            debug!("resource monitor already running");
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());
        let inner = Arc::clone(&self.inner);
        info!(
            interval_ms = inner.interval.as_millis() as u64,
            "resource monitor started"
        );
        let task = tokio::spawn({
            let stop = Arc::clone(&stop);
            let shutdown = Arc::clone(&shutdown);
            async move {
                let mut interval = tokio::time::interval(inner.interval);
                loop {
                    tokio::select! {
                        _ = shutdown.notified() => break,
                        _ = interval.tick() => {
                            if stop.load(Ordering::SeqCst) {
                                break;
                            }
                            inner.tick().await;
                        }
                    }
                }
                debug!("resource monitor loop exited");
            }
        });
        *slot = Some(RunState {
            task,
            stop,
            shutdown,
        });
    }

    /// Cancel the sampling timer. Calling on a stopped monitor is a no-op.
    pub fn stop(&self) {
        let mut slot = self.run.lock().expect("run lock poisoned");
        let Some(run) = slot.take() else {
            return;
        };
        run.stop.store(true, Ordering::SeqCst);
        run.shutdown.notify_waiters();
        info!("resource monitor stopped");
    }

    /// Whether the sampling task is live.
    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .expect("run lock poisoned")
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// One out-of-band sample, without waiting for the next tick and
    /// without dispatching to the classifier pipeline.
    pub fn sample_now(&self) -> Option<MemoryStats> {
        self.inner.source.sample()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            samples_taken: self.inner.samples_taken.load(Ordering::Relaxed),
            samples_skipped: self.inner.samples_skipped.load(Ordering::Relaxed),
            warnings_observed: self.inner.warnings_observed.load(Ordering::Relaxed),
            criticals_observed: self.inner.criticals_observed.load(Ordering::Relaxed),
            recoveries_started: self.inner.recoveries_started.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
