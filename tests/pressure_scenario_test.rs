//! End-to-end pressure timeline scenarios: monitor -> classifier ->
//! recovery controller -> subscribers + volatile cache purge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use fieldfare::{
    CacheKey, CacheStore, MonitorSettings, NoticeLevel, NotificationSink, Partition,
    RecordingSink, RecoveryController, ResourceMonitor, ScriptedSource, Severity,
    SubscriberRegistry,
};

struct Harness {
    monitor: ResourceMonitor,
    registry: Arc<SubscriberRegistry>,
    cache: CacheStore,
    sink: Arc<RecordingSink>,
    severities: Arc<Mutex<Vec<Severity>>>,
}

fn build_harness(settings: MonitorSettings, percentages: &[f64]) -> Harness {
    let source = Arc::new(ScriptedSource::from_percentages(percentages));
    let registry = Arc::new(SubscriberRegistry::new());
    let cache = CacheStore::new();
    let sink = Arc::new(RecordingSink::new());

    let recovery = Arc::new(RecoveryController::new(
        settings.auto_recovery_enabled,
        settings.min_recovery_interval(),
        Arc::clone(&registry),
        cache.clone(),
        sink.clone() as Arc<dyn NotificationSink>,
    ));
    let monitor = ResourceMonitor::new(
        &settings,
        source,
        recovery,
        sink.clone() as Arc<dyn NotificationSink>,
    )
    .expect("valid settings");

    let severities = Arc::new(Mutex::new(Vec::new()));
    {
        let severities = Arc::clone(&severities);
        monitor.set_on_sample(move |_, severity| {
            severities.lock().unwrap().push(severity);
        });
    }

    Harness {
        monitor,
        registry,
        cache,
        sink,
        severities,
    }
}

fn scenario_settings() -> MonitorSettings {
    MonitorSettings {
        warning_threshold: 50.0,
        critical_threshold: 65.0,
        check_interval_ms: 5_000,
        auto_recovery_enabled: true,
        min_recovery_interval_ms: 20_000,
        memory_limit_mb: None,
    }
}

/// Samples 40/55/70/72% at t=0/5/10/15s classify Normal, Warning, Critical,
/// Critical; exactly one recovery session starts, at the first Critical;
/// the second Critical lands inside the cooldown and starts nothing.
#[tokio::test(start_paused = true)]
async fn test_escalation_timeline_starts_exactly_one_recovery() {
    let harness = build_harness(scenario_settings(), &[40.0, 55.0, 70.0, 72.0]);

    let recovered = Arc::new(AtomicUsize::new(0));
    {
        let recovered = Arc::clone(&recovered);
        harness.registry.subscribe(move || {
            recovered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    harness
        .cache
        .insert_fresh(&CacheKey::of(Partition::ImageCache), json!("decoded"))
        .await;
    harness
        .cache
        .insert_fresh(&CacheKey::of(Partition::SpeciesList), json!(["fieldfare"]))
        .await;

    harness.monitor.start();
    tokio::time::sleep(Duration::from_secs(16)).await;
    harness.monitor.stop();

    assert_eq!(
        *harness.severities.lock().unwrap(),
        vec![
            Severity::Normal,
            Severity::Warning,
            Severity::Critical,
            Severity::Critical
        ]
    );

    let stats = harness.monitor.stats();
    assert_eq!(stats.samples_taken, 4);
    assert_eq!(stats.criticals_observed, 2);
    // One session despite two Critical observations: cooldown not elapsed.
    assert_eq!(stats.recoveries_started, 1);
    assert_eq!(recovered.load(Ordering::SeqCst), 1);

    // The session purged volatile caches only.
    assert_eq!(harness.cache.entry_count(Partition::ImageCache).await, 0);
    assert_eq!(harness.cache.entry_count(Partition::SpeciesList).await, 1);

    // Notices: one warning transition, one critical transition, one
    // recovery completion.
    assert_eq!(harness.sink.count_at(NoticeLevel::Warning), 1);
    assert_eq!(harness.sink.count_at(NoticeLevel::Error), 1);
    assert_eq!(harness.sink.count_at(NoticeLevel::Success), 1);
}

/// Once the cooldown elapses, sustained critical pressure is allowed to
/// start a second session — and the session starts stay at least the
/// cooldown apart.
#[tokio::test(start_paused = true)]
async fn test_sustained_critical_respects_cooldown_spacing() {
    let settings = MonitorSettings {
        min_recovery_interval_ms: 8_000,
        ..scenario_settings()
    };
    // Critical on every tick: t = 0, 5, 10, 15, 20s.
    let harness = build_harness(settings, &[70.0, 70.0, 70.0, 70.0, 70.0]);

    harness.monitor.start();
    tokio::time::sleep(Duration::from_secs(21)).await;
    harness.monitor.stop();

    // Eligible starts: t=0, t=10 (10 >= 8), t=20 (20 - 10 >= 8).
    let stats = harness.monitor.stats();
    assert_eq!(stats.criticals_observed, 5);
    assert_eq!(stats.recoveries_started, 3);
    assert_eq!(harness.sink.count_at(NoticeLevel::Success), 3);
}

/// With auto-recovery disabled, critical pressure is observed and notified
/// but never acted on.
#[tokio::test(start_paused = true)]
async fn test_auto_recovery_disabled_observes_without_acting() {
    let settings = MonitorSettings {
        auto_recovery_enabled: false,
        ..scenario_settings()
    };
    let harness = build_harness(settings, &[70.0, 72.0]);

    let recovered = Arc::new(AtomicUsize::new(0));
    {
        let recovered = Arc::clone(&recovered);
        harness.registry.subscribe(move || {
            recovered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    harness.monitor.start();
    tokio::time::sleep(Duration::from_secs(6)).await;
    harness.monitor.stop();

    let stats = harness.monitor.stats();
    assert_eq!(stats.criticals_observed, 2);
    assert_eq!(stats.recoveries_started, 0);
    assert_eq!(recovered.load(Ordering::SeqCst), 0);
    // The critical transition notice still fired.
    assert_eq!(harness.sink.count_at(NoticeLevel::Error), 1);
    assert_eq!(harness.sink.count_at(NoticeLevel::Success), 0);
}

/// A monitor whose telemetry disappears mid-run keeps ticking without
/// classifying and resumes when samples return.
#[tokio::test(start_paused = true)]
async fn test_telemetry_gap_skips_without_stopping() {
    let source = Arc::new(ScriptedSource::new(vec![
        Some(fieldfare::MemoryStats::new(400, 1000, 1000)),
        None,
        None,
        Some(fieldfare::MemoryStats::new(550, 1000, 1000)),
    ]));
    let settings = scenario_settings();
    let registry = Arc::new(SubscriberRegistry::new());
    let cache = CacheStore::new();
    let sink = Arc::new(RecordingSink::new());
    let recovery = Arc::new(RecoveryController::new(
        true,
        settings.min_recovery_interval(),
        registry,
        cache,
        sink.clone() as Arc<dyn NotificationSink>,
    ));
    let monitor = ResourceMonitor::new(
        &settings,
        source,
        recovery,
        sink.clone() as Arc<dyn NotificationSink>,
    )
    .unwrap();

    monitor.start();
    tokio::time::sleep(Duration::from_secs(16)).await;
    monitor.stop();

    let stats = monitor.stats();
    assert_eq!(stats.samples_taken, 2);
    assert_eq!(stats.samples_skipped, 2);
    assert_eq!(stats.warnings_observed, 1);
}
