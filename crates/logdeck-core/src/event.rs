//! Structured execution events
//!
//! A [`LogEvent`] is one immutable record in a run's append-only stream.
//! Beyond the fixed fields it carries an open-ended metadata bag; unknown
//! fields from the feed are passed through untouched.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fixed fields that are never part of the metadata bag
const FIXED_FIELDS: &[&str] = &["type", "level", "stage", "timestamp", "message", "id", "seq"];

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Short badge text for row rendering
    pub fn badge(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERR",
            LogLevel::Warn => "WRN",
            LogLevel::Info => "INF",
            LogLevel::Debug => "DBG",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
        }
    }

    /// Wire representation, matching the feed's `level` field
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// All levels, ordered by severity
    pub fn all() -> [LogLevel; 4] {
        [LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "trace" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// One immutable record in a run's event stream
///
/// `seq` is strictly increasing within one source stream. Events are never
/// mutated after creation, only appended or superseded by a full refetch.
///
/// # Examples
///
/// ```
/// use logdeck_core::event::LogEvent;
///
/// let json = r#"{"seq":7,"type":"validation","level":"warn",
///                "timestamp":1724300000000,"message":"lint failed",
///                "file":"src/main.rs","line":42}"#;
/// let event: LogEvent = serde_json::from_str(json).unwrap();
/// assert_eq!(event.seq, 7);
/// assert!(event.has_metadata());
/// assert_eq!(event.metadata.get("line").and_then(|v| v.as_i64()), Some(42));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Monotonic sequence number within the source stream
    pub seq: u64,
    /// Stable identifier, when the feed provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event category (e.g. "validation", "build", "dispatch")
    #[serde(rename = "type")]
    pub event_type: String,
    /// Severity
    pub level: LogLevel,
    /// Optional pipeline phase tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Display message
    pub message: String,
    /// Open-ended bag of additional fields, captured as-is from the feed
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl LogEvent {
    /// The metadata bag with any fixed fields stripped out
    ///
    /// Deserialization already routes fixed fields into their own struct
    /// members, but a feed may still echo them inside the bag; those copies
    /// are not part of the metadata panel.
    pub fn extra_metadata(&self) -> BTreeMap<&str, &Value> {
        self.metadata
            .iter()
            .filter(|(k, _)| !FIXED_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// Whether the stripped metadata bag is non-empty
    pub fn has_metadata(&self) -> bool {
        !self.extra_metadata().is_empty()
    }

    /// Canonical, indentation-stable text rendering of the metadata bag
    ///
    /// Keys are sorted, so the same bag always serializes to the same text
    /// and therefore the same line count.
    pub fn metadata_text(&self) -> String {
        let bag = self.extra_metadata();
        serde_json::to_string_pretty(&bag).unwrap_or_default()
    }

    /// Number of lines the rendered metadata panel occupies
    ///
    /// Zero for an empty bag; such rows are never expandable.
    pub fn metadata_line_count(&self) -> usize {
        if self.has_metadata() {
            self.metadata_text().lines().count()
        } else {
            0
        }
    }

    /// Event timestamp as a UTC instant, if representable
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Timestamp formatted as local wall-clock time for row display
    pub fn local_time(&self) -> String {
        match Local.timestamp_millis_opt(self.timestamp).single() {
            Some(dt) => dt.format("%H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with_metadata(pairs: &[(&str, Value)]) -> LogEvent {
        let mut metadata = Map::new();
        for (k, v) in pairs {
            metadata.insert((*k).to_string(), v.clone());
        }
        LogEvent {
            seq: 1,
            id: None,
            event_type: "validation".to_string(),
            level: LogLevel::Info,
            stage: None,
            timestamp: 1_724_300_000_000,
            message: "hello".to_string(),
            metadata,
        }
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_unknown_fields_land_in_metadata() {
        let json = r#"{"seq":3,"type":"build","level":"info","timestamp":0,
                       "message":"ok","duration_ms":120,"worker":"w-1"}"#;
        let event: LogEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.metadata.len(), 2);
        assert_eq!(event.metadata.get("worker").and_then(|v| v.as_str()), Some("w-1"));
    }

    #[test]
    fn test_fixed_fields_stripped_from_bag() {
        let event = event_with_metadata(&[
            ("message", json!("echoed copy")),
            ("seq", json!(1)),
            ("attempt", json!(2)),
        ]);
        let bag = event.extra_metadata();
        assert_eq!(bag.len(), 1);
        assert!(bag.contains_key("attempt"));
    }

    #[test]
    fn test_empty_bag_is_not_expandable() {
        let event = event_with_metadata(&[]);
        assert!(!event.has_metadata());
        assert_eq!(event.metadata_line_count(), 0);

        // Fixed-field echoes alone do not make a row expandable
        let echoed = event_with_metadata(&[("level", json!("info"))]);
        assert!(!echoed.has_metadata());
    }

    #[test]
    fn test_metadata_text_is_stable() {
        let event = event_with_metadata(&[("b", json!(1)), ("a", json!({"x": true}))]);
        let first = event.metadata_text();
        assert_eq!(first, event.metadata_text());
        // Sorted keys: "a" renders before "b"
        assert!(first.find("\"a\"").unwrap() < first.find("\"b\"").unwrap());
        assert_eq!(event.metadata_line_count(), first.lines().count());
    }
}
