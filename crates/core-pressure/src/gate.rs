//! Recovery gating: single-session and cooldown admission control
//!
//! Critical pressure observations arrive on every monitor tick, but a
//! recovery pass is a heavyweight broadcast (subscriber callbacks plus cache
//! eviction) that must be debounced. The gate admits a new session only when
//! no session is currently in progress *and* the cooldown since the last
//! session start has elapsed. Both checks happen in one call so the caller
//! can hold them atomic within a single turn of the event loop.
//!
//! The gate carries no clock of its own — the caller supplies `now`, which
//! keeps the state machine deterministic under test.
//!
//! # Example
//!
//! ```
//! use fieldfare_core_pressure::gate::{GateDecision, RecoveryGate};
//! use std::time::{Duration, Instant};
//!
//! let mut gate = RecoveryGate::new(Duration::from_secs(20));
//! let t0 = Instant::now();
//!
//! assert_eq!(gate.try_begin(t0), GateDecision::Begin);
//! // A second observation while the session runs is rejected.
//! assert_eq!(gate.try_begin(t0), GateDecision::InProgress);
//!
//! gate.complete();
//! // Still rejected: the cooldown window is measured from the session start.
//! assert!(matches!(
//!     gate.try_begin(t0 + Duration::from_secs(5)),
//!     GateDecision::CoolingDown { .. }
//! ));
//! assert_eq!(gate.try_begin(t0 + Duration::from_secs(20)), GateDecision::Begin);
//! ```

use std::time::{Duration, Instant};

/// Outcome of asking the gate to admit a recovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Admitted: the gate is now marked in-progress and stamped with `now`
    Begin,
    /// Rejected: a session is already running
    InProgress,
    /// Rejected: the cooldown since the last session start has not elapsed
    CoolingDown { remaining: Duration },
}

/// Admission state for recovery sessions.
///
/// At most one session is live at a time; session frequency is additionally
/// throttled by a cooldown measured between session *starts*, so rapid
/// oscillation across the critical line cannot thrash recovery even when
/// sessions themselves are short.
#[derive(Debug)]
pub struct RecoveryGate {
    cooldown: Duration,
    in_progress: bool,
    last_started: Option<Instant>,
}

impl RecoveryGate {
    /// Create a gate with the given minimum interval between session starts.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            in_progress: false,
            last_started: None,
        }
    }

    /// Ask to begin a session at `now`.
    ///
    /// On `Begin` the gate transitions to in-progress and records `now` as
    /// the session start; the caller must later call [`complete`] exactly
    /// once. Any rejection leaves the gate untouched.
    ///
    /// [`complete`]: RecoveryGate::complete
    pub fn try_begin(&mut self, now: Instant) -> GateDecision {
        if self.in_progress {
            return GateDecision::InProgress;
        }

        if let Some(started) = self.last_started {
            let elapsed = now.saturating_duration_since(started);
            if elapsed < self.cooldown {
                return GateDecision::CoolingDown {
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        self.in_progress = true;
        self.last_started = Some(now);
        GateDecision::Begin
    }

    /// Mark the in-flight session finished.
    ///
    /// Idempotent; the cooldown keeps running from the recorded start.
    pub fn complete(&mut self) {
        self.in_progress = false;
    }

    /// Whether a session is currently running.
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// When the most recent session started, if any has.
    pub fn last_started(&self) -> Option<Instant> {
        self.last_started
    }

    /// The configured minimum interval between session starts.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
