//! Fieldfare Core Pressure: Pure-logic memory-pressure primitives
//!
//! # Overview
//!
//! This crate provides the decision-making building blocks for a client-side
//! resource-pressure controller:
//!
//! - **Memory snapshots**: point-in-time usage stats with a derived percentage
//! - **Severity classification**: a pure threshold ladder (Normal / Warning / Critical)
//! - **Recovery gate**: single-session plus cooldown admission control
//! - **Backoff schedule**: capped exponential delays for bounded retries
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - The async runtime (no timers, no tasks — callers supply `Instant`s)
//! - System telemetry sources (callers build the snapshots)
//! - Caches, remote actors, or any other application concern
//!
//! That keeps every state transition deterministic and unit-testable without
//! a runtime.
//!
//! # Usage Example
//!
//! ```
//! use fieldfare_core_pressure::prelude::*;
//! use std::time::{Duration, Instant};
//!
//! let thresholds = PressureThresholds::default();
//! let mut gate = RecoveryGate::new(Duration::from_secs(60));
//!
//! let stats = MemoryStats::new(950, 1000, 1000);
//! if classify(stats.usage_percentage, &thresholds) == Severity::Critical {
//!     if gate.try_begin(Instant::now()) == GateDecision::Begin {
//!         // ... run the recovery pass ...
//!         gate.complete();
//!     }
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod gate;
pub mod memory;

// Re-export main types for convenience
pub use backoff::BackoffSchedule;
pub use error::PressureError;
pub use gate::{GateDecision, RecoveryGate};
pub use memory::{classify, MemoryStats, PressureThresholds, Severity};

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use fieldfare_core_pressure::prelude::*;
/// ```
pub mod prelude {
    pub use super::backoff::BackoffSchedule;
    pub use super::error::PressureError;
    pub use super::gate::{GateDecision, RecoveryGate};
    pub use super::memory::{classify, MemoryStats, PressureThresholds, Severity};
}
