//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::util::parse_timestamp;

/// Generate a fresh opaque session identifier (UUID v7, time-sortable).
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// A single focused work interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque unique identifier, stable once assigned
    pub id: String,
    /// Free-text label
    pub subject: String,
    /// Length in minutes
    pub duration: f64,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl Session {
    /// Create an open (not completed) session with a fresh id
    #[must_use]
    pub fn new(subject: impl Into<String>, duration: f64, start_time: DateTime<Utc>) -> Self {
        Self {
            id: generate_session_id(),
            subject: subject.into(),
            duration,
            start_time,
            end_time: None,
            completed: false,
        }
    }

    /// A completed session of `minutes` that ends now.
    ///
    /// This is what the timer hands over when a countdown reaches zero.
    #[must_use]
    pub fn finished_now(subject: impl Into<String>, minutes: f64) -> Self {
        let end_time = Utc::now();
        #[allow(clippy::cast_possible_truncation)]
        let elapsed = Duration::milliseconds((minutes * 60_000.0).round() as i64);
        Self::new(subject, minutes, end_time - elapsed)
            .with_end_time(end_time)
            .mark_completed()
    }

    #[must_use]
    pub const fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    #[must_use]
    pub const fn mark_completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Build a session from a JSON-shaped candidate that passed validation.
    ///
    /// Timestamps go through the lenient parser, so legacy layouts are
    /// normalized to UTC. Returns `None` if a required field is unusable.
    pub fn from_candidate(candidate: &Value) -> Option<Self> {
        let record = candidate.as_object()?;
        let end_time = match record.get("endTime") {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_timestamp(value.as_str()?)?),
        };

        Some(Self {
            id: record.get("id")?.as_str()?.to_string(),
            subject: record.get("subject")?.as_str()?.to_string(),
            duration: record.get("duration")?.as_f64()?,
            start_time: parse_timestamp(record.get("startTime")?.as_str()?)?,
            end_time,
            completed: record.get("completed")?.as_bool()?,
        })
    }

    /// Subject key used for duplicate matching: trimmed and lowercased.
    #[must_use]
    pub fn subject_key(&self) -> String {
        self.subject.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn finished_now_spans_requested_minutes() {
        let session = Session::finished_now("Math", 25.0);
        assert!(session.completed);
        let end = session.end_time.unwrap();
        assert_eq!((end - session.start_time).num_minutes(), 25);
    }

    #[test]
    fn serializes_with_camel_case_and_omits_missing_end() {
        let start = "2024-03-01T09:00:00Z".parse().unwrap();
        let mut session = Session::new("Reading", 30.0, start);
        session.id = "abc".to_string();

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["startTime"], "2024-03-01T09:00:00Z");
        assert!(value.get("endTime").is_none());
        assert_eq!(value["completed"], false);
    }

    #[test]
    fn from_candidate_normalizes_timestamps() {
        let candidate = serde_json::json!({
            "id": "legacy-1",
            "subject": "Physics",
            "duration": 50,
            "startTime": "2024-03-01T10:00:00+01:00",
            "completed": true
        });

        let session = Session::from_candidate(&candidate).unwrap();
        assert_eq!(session.start_time.to_rfc3339(), "2024-03-01T09:00:00+00:00");
        assert_eq!(session.end_time, None);
        assert!((session.duration - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_candidate_rejects_missing_fields() {
        let candidate = serde_json::json!({ "subject": "Physics" });
        assert!(Session::from_candidate(&candidate).is_none());
    }

    #[test]
    fn subject_key_ignores_case_and_whitespace() {
        let start = Utc::now();
        assert_eq!(Session::new("  Math ", 25.0, start).subject_key(), "math");
    }
}
