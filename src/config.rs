//! Configuration types for Fieldfare
//!
//! Loaded once from TOML at startup and validated before the monitor starts.
//! Monitor policy is immutable while sampling runs; changing it means stop,
//! reconfigure, start.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldfare_core_pressure::{BackoffSchedule, PressureThresholds};

use crate::error::{FieldfareError, Result};

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Policy for the resource monitor and recovery controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Usage percentage at which pressure becomes a warning
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    /// Usage percentage at which pressure becomes critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    /// Sampling interval in milliseconds
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Whether sustained critical pressure triggers recovery automatically
    #[serde(default = "default_true")]
    pub auto_recovery_enabled: bool,

    /// Minimum interval between recovery session starts, in milliseconds
    #[serde(default = "default_min_recovery_interval_ms")]
    pub min_recovery_interval_ms: u64,

    /// Memory ceiling used for percentage computation, in MiB.
    /// `None` uses total system memory.
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            check_interval_ms: default_check_interval_ms(),
            auto_recovery_enabled: true,
            min_recovery_interval_ms: default_min_recovery_interval_ms(),
            memory_limit_mb: None,
        }
    }
}

impl MonitorSettings {
    pub fn thresholds(&self) -> PressureThresholds {
        PressureThresholds {
            warning_pct: self.warning_threshold,
            critical_pct: self.critical_threshold,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn min_recovery_interval(&self) -> Duration {
        Duration::from_millis(self.min_recovery_interval_ms)
    }

    /// Validate the monitor policy invariants.
    pub fn validate(&self) -> Result<()> {
        self.thresholds()
            .validate()
            .map_err(|e| FieldfareError::Config(e.to_string()))?;

        if self.check_interval_ms == 0 {
            return Err(FieldfareError::Config(
                "check_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Policy for retried remote writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts allowed per write, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling on any single backoff delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(FieldfareError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_delay_ms == 0 {
            return Err(FieldfareError::Config(
                "base_delay_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FieldfareError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|e| {
            FieldfareError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

fn default_warning_threshold() -> f64 {
    75.0
}

fn default_critical_threshold() -> f64 {
    90.0
}

fn default_check_interval_ms() -> u64 {
    30_000
}

fn default_min_recovery_interval_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}
