//! Metrics sources: where memory snapshots come from
//!
//! The monitor never talks to runtime telemetry directly — it samples through
//! the [`MetricsSource`] trait, so it runs unchanged against real system
//! telemetry, a scripted test source, or a runtime that exposes nothing at
//! all (in which case every sample is absent and the monitor degrades to a
//! no-op).
//!
//! A source must never panic past this boundary: any underlying failure is
//! reported as an absent sample.

use std::collections::VecDeque;
use std::sync::Mutex;

use sysinfo::System;
use tracing::debug;

use fieldfare_core_pressure::MemoryStats;

/// Provider of point-in-time memory snapshots.
///
/// `None` means the runtime could not report usage for this sample; it is
/// not zero, and the monitor skips classification entirely for that tick.
pub trait MetricsSource: Send + Sync {
    fn sample(&self) -> Option<MemoryStats>;
}

/// Real telemetry via the system information tables.
///
/// Native processes have no heap ceiling the way browser runtimes do, so the
/// percentage is computed against a configured soft limit, defaulting to
/// total system memory.
pub struct SysinfoSource {
    system: Mutex<System>,
    limit_bytes: Option<u64>,
}

impl SysinfoSource {
    /// Create a source measuring against total system memory.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            limit_bytes: None,
        }
    }

    /// Create a source measuring against an explicit ceiling in MiB.
    pub fn with_limit_mb(limit_mb: u64) -> Self {
        Self {
            system: Mutex::new(System::new()),
            limit_bytes: Some(limit_mb * 1024 * 1024),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SysinfoSource {
    fn sample(&self) -> Option<MemoryStats> {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                debug!("metrics source lock poisoned; recovering");
                poisoned.into_inner()
            }
        };

        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            // Platform reported nothing useful; absent, not 0%.
            return None;
        }

        let used = system.used_memory();
        let limit = self.limit_bytes.unwrap_or(total);
        Some(MemoryStats::new(used, total, limit))
    }
}

/// Deterministic source that replays a fixed sequence of samples.
///
/// Once the script is exhausted every further sample is absent, which is
/// also how it models a runtime with no telemetry (an empty script).
#[derive(Debug, Default)]
pub struct ScriptedSource {
    samples: Mutex<VecDeque<Option<MemoryStats>>>,
}

impl ScriptedSource {
    pub fn new(samples: Vec<Option<MemoryStats>>) -> Self {
        Self {
            samples: Mutex::new(samples.into()),
        }
    }

    /// Script a sequence of usage percentages against a limit of 1000 bytes.
    pub fn from_percentages(percentages: &[f64]) -> Self {
        let samples = percentages
            .iter()
            .map(|pct| Some(MemoryStats::new((pct * 10.0) as u64, 1000, 1000)))
            .collect();
        Self::new(samples)
    }

    /// Append a sample to the end of the script.
    pub fn push(&self, sample: Option<MemoryStats>) {
        self.samples
            .lock()
            .expect("script lock poisoned")
            .push_back(sample);
    }

    /// Samples remaining in the script.
    pub fn remaining(&self) -> usize {
        self.samples.lock().expect("script lock poisoned").len()
    }
}

impl MetricsSource for ScriptedSource {
    fn sample(&self) -> Option<MemoryStats> {
        self.samples
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .flatten()
    }
}
