//! Notification sink: the seam between this core and the toast UI
//!
//! The core emits `(level, message, duration)` tuples on the handful of
//! user-visible events — severity transitions, recovery completion, terminal
//! write failures. Rendering is somebody else's job; the default sink here
//! just routes to the log so a headless deployment still records them.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{error, info, warn};

/// Visual severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// Receiver for user-visible notifications.
///
/// Implementations must not block: the monitor and retry paths call this
/// inline from background machinery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str, duration: Duration);
}

/// Default sink that routes notifications into the log stream
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, level: NoticeLevel, message: &str, _duration: Duration) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => info!(notice = %level, "{}", message),
            NoticeLevel::Warning => warn!(notice = %level, "{}", message),
            NoticeLevel::Error => error!(notice = %level, "{}", message),
        }
    }
}

/// A captured notification, as recorded by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration: Duration,
}

/// Sink that records every notification, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("sink lock poisoned").clone()
    }

    /// Count of recorded notices at the given level
    pub fn count_at(&self, level: NoticeLevel) -> usize {
        self.notices
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, level: NoticeLevel, message: &str, duration: Duration) {
        self.notices
            .lock()
            .expect("sink lock poisoned")
            .push(Notice {
                level,
                message: message.to_string(),
                duration,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_captures_in_order() {
        let sink = RecordingSink::new();
        sink.notify(NoticeLevel::Warning, "memory elevated", Duration::from_secs(5));
        sink.notify(NoticeLevel::Error, "write failed", Duration::from_secs(8));

        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].message, "memory elevated");
        assert_eq!(notices[1].level, NoticeLevel::Error);
    }

    #[test]
    fn test_count_at_level() {
        let sink = RecordingSink::new();
        sink.notify(NoticeLevel::Info, "a", Duration::ZERO);
        sink.notify(NoticeLevel::Info, "b", Duration::ZERO);
        sink.notify(NoticeLevel::Success, "c", Duration::ZERO);

        assert_eq!(sink.count_at(NoticeLevel::Info), 2);
        assert_eq!(sink.count_at(NoticeLevel::Success), 1);
        assert_eq!(sink.count_at(NoticeLevel::Error), 0);
    }
}
