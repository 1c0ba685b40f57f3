//! Error types for the pressure primitives

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PressureError {
    /// Threshold ordering invariant violated
    #[error(
        "invalid pressure thresholds: warning {warning_pct}% must be in (0, critical) and critical {critical_pct}% in (warning, 100]"
    )]
    InvalidThresholds { warning_pct: f64, critical_pct: f64 },
}
