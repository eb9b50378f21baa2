//! User-facing notifications
//!
//! The presentation sink is an external collaborator: the core only builds
//! [`Notice`] values and hands them to a [`Notifier`]. Every failed fetch
//! attempt produces exactly one notice.

use std::time::Duration;

/// A single action the user can take from a notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeAction {
    pub label: String,
}

/// A short user-facing message with optional detail and action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub description: Option<String>,
    pub action: Option<NoticeAction>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: None,
            action: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, label: impl Into<String>) -> Self {
        self.action = Some(NoticeAction {
            label: label.into(),
        });
        self
    }

    /// Notice for a failed fetch attempt, offering a retry
    pub fn fetch_failed(reason: impl Into<String>) -> Self {
        Notice::info("Could not load events")
            .with_description(reason)
            .with_action("Retry")
    }

    /// Informational notice naming the backoff delay before a retry fires
    pub fn retry_countdown(delay: Duration) -> Self {
        Notice::info(format!("Retrying in {}s...", delay.as_secs()))
    }

    /// Stale-cache banner notice shown when a refresh fails over live data
    pub fn stale_cache() -> Self {
        Notice::info("Connection lost - showing cached events")
            .with_action("Reconnect")
    }
}

/// Sink for user-facing notices
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_countdown_names_delay() {
        let notice = Notice::retry_countdown(Duration::from_secs(4));
        assert!(notice.message.contains("4s"));
    }

    #[test]
    fn test_stale_notice_mentions_cache() {
        let notice = Notice::stale_cache();
        assert!(notice.message.to_lowercase().contains("cache"));
        assert_eq!(notice.action.unwrap().label, "Reconnect");
    }

    #[test]
    fn test_fetch_failed_has_retry_action() {
        let notice = Notice::fetch_failed("Network timeout");
        assert_eq!(notice.action.unwrap().label, "Retry");
        assert_eq!(notice.description.unwrap(), "Network timeout");
    }
}
