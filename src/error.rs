//! Error types for Fieldfare
//!
//! The taxonomy mirrors how failures are handled, not where they occur:
//! permission failures are terminal and never retried, transport/timeout
//! failures are transient and eligible for backoff, and everything else is
//! surfaced as-is. Remote actors that only report a message string are
//! classified by pattern match via [`FieldfareError::from_remote_message`].

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldfareError>;

#[derive(Error, Debug, Clone)]
pub enum FieldfareError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote actor rejected the caller's credentials or role
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Transient transport failure (network, connection, service hiccup)
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote operation timed out
    #[error("remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// Remote failure that is neither a permission nor a transport problem
    #[error("remote actor error: {0}")]
    Remote(String),
}

/// Message fragments that mark a failure as permission-class.
const PERMISSION_PATTERNS: &[&str] = &[
    "permission",
    "unauthorized",
    "forbidden",
    "access denied",
    "not allowed",
    "requires role",
];

impl FieldfareError {
    /// Classify a raw remote failure message.
    ///
    /// Permission-class messages become [`PermissionDenied`]; everything else
    /// is treated as transport-class and eligible for retry. Remote actors
    /// that can report typed failures should construct variants directly
    /// instead.
    ///
    /// [`PermissionDenied`]: FieldfareError::PermissionDenied
    pub fn from_remote_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        if PERMISSION_PATTERNS.iter().any(|p| lowered.contains(p)) {
            FieldfareError::PermissionDenied(message)
        } else {
            FieldfareError::Transport(message)
        }
    }

    /// Check if this error is a permission failure (never retried)
    pub fn is_permission(&self) -> bool {
        matches!(self, FieldfareError::PermissionDenied(_))
    }

    /// Check if this error is transient (worth retrying with backoff)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FieldfareError::Transport(_) | FieldfareError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_message_classification() {
        let cases = [
            "Permission denied: editor role required",
            "401 Unauthorized",
            "forbidden by policy",
            "access denied for user",
            "write not allowed on roster",
        ];
        for msg in cases {
            let err = FieldfareError::from_remote_message(msg);
            assert!(err.is_permission(), "expected permission class: {}", msg);
            assert!(!err.is_transient());
        }
    }

    #[test]
    fn test_transient_message_classification() {
        let cases = [
            "connection reset by peer",
            "gateway timeout",
            "service unavailable",
            "something unexpected",
        ];
        for msg in cases {
            let err = FieldfareError::from_remote_message(msg);
            assert!(err.is_transient(), "expected transient class: {}", msg);
            assert!(!err.is_permission());
        }
    }

    #[test]
    fn test_typed_classification() {
        assert!(FieldfareError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(!FieldfareError::Remote("schema mismatch".into()).is_transient());
        assert!(!FieldfareError::Config("bad threshold".into()).is_transient());
        assert!(!FieldfareError::Remote("schema mismatch".into()).is_permission());
    }

    #[test]
    fn test_original_message_preserved() {
        let err = FieldfareError::from_remote_message("Permission denied: viewer");
        assert_eq!(
            err.to_string(),
            "permission denied: Permission denied: viewer"
        );
    }
}
