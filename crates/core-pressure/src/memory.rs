//! Memory snapshots and severity classification
//!
//! A `MemoryStats` is a point-in-time snapshot of heap usage. The usage
//! percentage is computed at construction from `used / limit` and is never
//! carried over between samples — every monitor tick builds a fresh snapshot.
//!
//! Classification is a pure function of the latest snapshot against a pair of
//! thresholds. There is no hysteresis band: the same percentage always maps to
//! the same severity, and flapping near a boundary is absorbed downstream by
//! the recovery cooldown, not here.
//!
//! # Example
//!
//! ```
//! use fieldfare_core_pressure::memory::{classify, MemoryStats, PressureThresholds, Severity};
//!
//! let thresholds = PressureThresholds {
//!     warning_pct: 75.0,
//!     critical_pct: 90.0,
//! };
//!
//! let stats = MemoryStats::new(920, 1000, 1000);
//! assert_eq!(classify(stats.usage_percentage, &thresholds), Severity::Critical);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PressureError;

/// A point-in-time snapshot of memory usage.
///
/// All sizes are in bytes. `usage_percentage` is derived from
/// `used_bytes / limit_bytes * 100` when the snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    /// Bytes currently in use
    pub used_bytes: u64,

    /// Total bytes the runtime has allocated from the system
    pub total_bytes: u64,

    /// Hard ceiling the runtime may grow to
    pub limit_bytes: u64,

    /// `used_bytes / limit_bytes * 100`, computed at construction
    pub usage_percentage: f64,
}

impl MemoryStats {
    /// Build a snapshot, deriving the usage percentage.
    ///
    /// A zero limit yields 0% rather than a division error; a runtime that
    /// cannot report its limit should produce an absent sample instead, so
    /// this is only a guard against degenerate telemetry.
    pub fn new(used_bytes: u64, total_bytes: u64, limit_bytes: u64) -> Self {
        let usage_percentage = if limit_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / limit_bytes as f64 * 100.0
        };

        Self {
            used_bytes,
            total_bytes,
            limit_bytes,
            usage_percentage,
        }
    }
}

/// Severity of the current memory pressure.
///
/// Derived fresh from each snapshot, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Usage below the warning threshold
    Normal,
    /// Usage at or above the warning threshold
    Warning,
    /// Usage at or above the critical threshold
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Normal => write!(f, "normal"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Classification thresholds, as usage percentages.
///
/// Invariant: `0 < warning_pct < critical_pct <= 100`. Enforced by
/// [`PressureThresholds::validate`], which callers run before starting a
/// monitor — thresholds are immutable once sampling begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureThresholds {
    /// Usage percentage at which pressure becomes a warning
    pub warning_pct: f64,

    /// Usage percentage at which pressure becomes critical
    pub critical_pct: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            warning_pct: 75.0,
            critical_pct: 90.0,
        }
    }
}

impl PressureThresholds {
    /// Validate the threshold ordering invariant.
    pub fn validate(&self) -> Result<(), PressureError> {
        if !(self.warning_pct > 0.0
            && self.warning_pct < self.critical_pct
            && self.critical_pct <= 100.0)
        {
            return Err(PressureError::InvalidThresholds {
                warning_pct: self.warning_pct,
                critical_pct: self.critical_pct,
            });
        }
        Ok(())
    }
}

/// Classify a usage percentage against the thresholds.
///
/// `>= critical` wins over `>= warning`; values exactly at a threshold take
/// the higher severity.
pub fn classify(usage_percentage: f64, thresholds: &PressureThresholds) -> Severity {
    if usage_percentage >= thresholds.critical_pct {
        Severity::Critical
    } else if usage_percentage >= thresholds.warning_pct {
        Severity::Warning
    } else {
        Severity::Normal
    }
}
