//! Activity events and their validation.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OwnerId;

/// Timestamp layout used by exported activity logs (UTC, no offset).
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Malformed or missing required fields in an activity record.
///
/// Not recoverable: a run that hits one of these is aborted, since partial
/// segmentation results would be misleading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("invalid timestamp {value:?} for owner {owner} at {file}:{line}")]
    InvalidTimestamp {
        owner: String,
        file: String,
        line: usize,
        value: String,
    },

    #[error("missing {field} at {file}:{line}")]
    MissingField {
        field: &'static str,
        file: String,
        line: usize,
    },
}

/// A validated activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Who produced the activity.
    pub owner: OwnerId,
    /// When the activity happened.
    pub timestamp: DateTime<Utc>,
    /// Where the record came from (e.g. a log file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Event {
    pub const fn new(owner: OwnerId, timestamp: DateTime<Utc>) -> Self {
        Self {
            owner,
            timestamp,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// An activity record as read from a log, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub owner: Option<String>,
    pub timestamp: Option<String>,
    pub source: Option<String>,
    /// 1-based record number within `source`.
    pub line: usize,
}

impl RawEvent {
    fn location(&self) -> String {
        self.source.clone().unwrap_or_else(|| "<input>".to_string())
    }
}

/// Parses a log timestamp.
///
/// Accepts the log layout (`2025-01-15 09:00:00`, read as UTC) and RFC 3339.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, LOG_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Validates raw records into events.
///
/// Records without an owner are dropped (and the drop is logged); any record
/// with a missing or unparseable timestamp fails the whole batch.
pub fn prepare_events<I>(raw: I) -> Result<Vec<Event>, DataError>
where
    I: IntoIterator<Item = RawEvent>,
{
    let mut events = Vec::new();
    let mut ownerless = 0usize;

    for record in raw {
        let Some(owner) = record
            .owner
            .as_deref()
            .and_then(|owner| OwnerId::new(owner).ok())
        else {
            ownerless += 1;
            continue;
        };

        let Some(value) = record.timestamp.as_deref() else {
            return Err(DataError::MissingField {
                field: "timestamp",
                file: record.location(),
                line: record.line,
            });
        };

        let timestamp = parse_timestamp(value).ok_or_else(|| DataError::InvalidTimestamp {
            owner: owner.to_string(),
            file: record.location(),
            line: record.line,
            value: value.to_string(),
        })?;

        events.push(Event {
            owner,
            timestamp,
            source: record.source,
        });
    }

    if ownerless > 0 {
        tracing::info!(count = ownerless, "excluded records without an owner");
    }
    tracing::debug!(count = events.len(), "prepared events");

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(owner: Option<&str>, timestamp: &str, line: usize) -> RawEvent {
        RawEvent {
            owner: owner.map(str::to_string),
            timestamp: Some(timestamp.to_string()),
            source: Some("log.txt".to_string()),
            line,
        }
    }

    #[test]
    fn parse_timestamp_accepts_log_format() {
        let ts = parse_timestamp("2025-01-15 09:10:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 15, 9, 10, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        let ts = parse_timestamp("2025-01-15T11:10:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 15, 9, 10, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2025-13-01 00:00:00").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn prepare_events_drops_ownerless_records() {
        let events = prepare_events(vec![
            raw(Some("a"), "2025-01-15 09:00:00", 1),
            raw(None, "2025-01-15 09:01:00", 2),
            raw(Some(""), "2025-01-15 09:02:00", 3),
            raw(Some("  "), "2025-01-15 09:03:00", 4),
        ])
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].owner.as_str(), "a");
        assert_eq!(events[0].source.as_deref(), Some("log.txt"));
    }

    #[test]
    fn prepare_events_ignores_bad_timestamp_on_ownerless_record() {
        let events = prepare_events(vec![raw(None, "not a time", 1)]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn prepare_events_fails_on_malformed_timestamp() {
        let err = prepare_events(vec![
            raw(Some("a"), "2025-01-15 09:00:00", 1),
            raw(Some("b"), "15/01/2025", 2),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            DataError::InvalidTimestamp {
                owner: "b".to_string(),
                file: "log.txt".to_string(),
                line: 2,
                value: "15/01/2025".to_string(),
            }
        );
        assert!(err.to_string().contains("log.txt:2"));
    }

    #[test]
    fn prepare_events_fails_on_missing_timestamp() {
        let record = RawEvent {
            owner: Some("a".to_string()),
            timestamp: None,
            source: None,
            line: 7,
        };
        let err = prepare_events(vec![record]).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingField {
                field: "timestamp",
                line: 7,
                ..
            }
        ));
    }

    #[test]
    fn event_serialization_skips_missing_source() {
        let event = Event::new(
            OwnerId::new("a").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("source"));
    }
}
