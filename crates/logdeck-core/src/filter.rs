//! The active query predicate
//!
//! [`FilterOptions`] is an immutable value: every edit produces a new value
//! rather than mutating in place, which keeps the debounce and epoch-barrier
//! logic in [`crate::retrieval`] simple. Absence of a field means "no
//! constraint on that dimension".

use crate::event::{LogEvent, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query predicate over the event stream
///
/// # Examples
///
/// ```
/// use logdeck_core::filter::FilterOptions;
/// use logdeck_core::event::LogLevel;
///
/// let base = FilterOptions::default();
/// let errors_only = base.clone().with_level(Some(LogLevel::Error));
///
/// assert!(!base.is_active());
/// assert!(errors_only.is_active());
/// assert_ne!(base, errors_only);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Only events at exactly this level
    pub level: Option<LogLevel>,
    /// Only events tagged with this pipeline stage
    pub stage: Option<String>,
    /// Only events of this category
    pub event_type: Option<String>,
    /// Case-insensitive substring match against the message
    pub search: Option<String>,
    /// Inclusive lower bound on the event timestamp
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event timestamp
    pub end: Option<DateTime<Utc>>,
}

impl FilterOptions {
    /// Replace the level constraint
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Replace the stage constraint
    pub fn with_stage(mut self, stage: Option<String>) -> Self {
        self.stage = stage;
        self
    }

    /// Replace the event-type constraint
    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    /// Replace the free-text search constraint
    ///
    /// An empty or whitespace-only string means "no constraint".
    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    /// Replace the inclusive time range
    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Whether any constraint is set
    ///
    /// Drives the empty-state message: an active filter prompts the user to
    /// adjust it, no filter prompts that events will appear once produced.
    pub fn is_active(&self) -> bool {
        self.level.is_some()
            || self.stage.is_some()
            || self.event_type.is_some()
            || self.search.is_some()
            || self.start.is_some()
            || self.end.is_some()
    }

    /// Evaluate the predicate against one event
    pub fn matches(&self, event: &LogEvent) -> bool {
        if let Some(level) = self.level
            && event.level != level
        {
            return false;
        }
        if let Some(stage) = &self.stage
            && event.stage.as_deref() != Some(stage.as_str())
        {
            return false;
        }
        if let Some(event_type) = &self.event_type
            && event.event_type != *event_type
        {
            return false;
        }
        if let Some(search) = &self.search
            && !event.message.to_lowercase().contains(&search.to_lowercase())
        {
            return false;
        }
        if self.start.is_some() || self.end.is_some() {
            let Some(at) = event.timestamp_utc() else {
                return false;
            };
            if let Some(start) = self.start
                && at < start
            {
                return false;
            }
            if let Some(end) = self.end
                && at > end
            {
                return false;
            }
        }
        true
    }

    /// Short summary of the active constraints for header display
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(level) = self.level {
            parts.push(format!("level={}", level));
        }
        if let Some(stage) = &self.stage {
            parts.push(format!("stage={}", stage));
        }
        if let Some(event_type) = &self.event_type {
            parts.push(format!("type={}", event_type));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search=\"{}\"", search));
        }
        if self.start.is_some() || self.end.is_some() {
            parts.push("range".to_string());
        }
        parts.join(" ")
    }
}
