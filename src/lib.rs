/*!
 * Fieldfare - resource-pressure and cache-consistency core
 *
 * The engine room of the Fieldfare survey client:
 * - Periodic memory-pressure sampling with Normal/Warning/Critical classification
 * - Debounced recovery broadcasts to registered subscribers under critical pressure
 * - A partitioned local cache mirroring remote survey data, with
 *   soft-invalidate / hard-clear / forced-full-sync consistency operations
 * - Classification-aware retry with exponential backoff for remote writes
 *
 * View rendering, upload transport, and the remote actor itself live
 * elsewhere; this crate only decides when reclamation happens and when
 * cached data must be refetched.
 */

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod recovery;
pub mod remote;
pub mod retry;
pub mod subscribers;

// Re-export commonly used types
pub use cache::{partitions_for_topic, CacheKey, CacheStore, Partition, Topic};
pub use client::SurveyClient;
pub use config::{AppConfig, MonitorSettings, RetrySettings};
pub use error::{FieldfareError, Result};
pub use metrics::{MetricsSource, ScriptedSource, SysinfoSource};
pub use monitor::{MonitorStats, ResourceMonitor};
pub use notify::{LogSink, NoticeLevel, NotificationSink, RecordingSink};
pub use recovery::RecoveryController;
pub use remote::{EntityKind, MockRemote, RemoteActor};
pub use retry::MutationRetryPolicy;
pub use subscribers::{RecoverySubscription, SubscriberRegistry};

// Pressure primitives, re-exported from the core crate
pub use fieldfare_core_pressure::{
    classify, BackoffSchedule, MemoryStats, PressureThresholds, Severity,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
