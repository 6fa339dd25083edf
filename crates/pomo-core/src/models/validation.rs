//! Record validation shared by load, save, migration, and import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Session;
use crate::util::parse_timestamp;

/// Issue severity. Errors block a record; warnings are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding, optionally tied to a row and column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            row: None,
            column: None,
            value: None,
        }
    }

    #[must_use]
    pub const fn at_row(mut self, row: Option<usize>) -> Self {
        self.row = row;
        self
    }

    #[must_use]
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True when any issue blocks acceptance.
pub fn has_blocking_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

/// Validate an untyped, JSON-shaped candidate record.
///
/// `row` is a 1-based position embedded in every message. With
/// `allow_missing_id` a missing id is tolerated; the caller assigns one.
pub fn validate_candidate(
    candidate: &Value,
    row: Option<usize>,
    allow_missing_id: bool,
) -> Vec<ValidationIssue> {
    let mut issues = Issues::new(row);

    let Some(record) = candidate.as_object() else {
        issues.error(None, "record must be an object", None);
        return issues.finish();
    };

    match record.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => {}
        None | Some(Value::Null) if allow_missing_id => {}
        Some(Value::String(_)) if allow_missing_id => {}
        other => issues.error(
            Some("id"),
            "id is required and must be a string",
            other.map(render_value),
        ),
    }

    match record.get("subject") {
        Some(Value::String(subject)) => issues.check_subject(subject),
        other => issues.error(
            Some("subject"),
            "subject is required and must be text",
            other.map(render_value),
        ),
    }

    match record.get("duration").and_then(Value::as_f64) {
        Some(duration) => issues.check_duration(duration),
        None => issues.error(
            Some("duration"),
            "duration must be a positive number",
            record.get("duration").map(render_value),
        ),
    }

    let start_time = match record.get("startTime") {
        Some(Value::String(raw)) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                issues.error(
                    Some("startTime"),
                    "startTime must be a valid date",
                    Some(raw.clone()),
                );
            }
            parsed
        }
        other => {
            issues.error(
                Some("startTime"),
                "startTime is required and must be a valid date",
                other.map(render_value),
            );
            None
        }
    };

    match record.get("endTime") {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) => match parse_timestamp(raw) {
            Some(end_time) => {
                if let Some(start_time) = start_time {
                    issues.check_order(start_time, end_time);
                }
            }
            None => issues.error(
                Some("endTime"),
                "endTime must be a valid date",
                Some(raw.clone()),
            ),
        },
        Some(other) => issues.error(
            Some("endTime"),
            "endTime must be a valid date",
            Some(render_value(other)),
        ),
    }

    if !matches!(record.get("completed"), Some(Value::Bool(_))) {
        issues.error(
            Some("completed"),
            "completed must be true or false",
            record.get("completed").map(render_value),
        );
    }

    issues.finish()
}

/// Validate an already-typed session before it is persisted.
pub fn validate_session(session: &Session, row: Option<usize>) -> Vec<ValidationIssue> {
    let mut issues = Issues::new(row);

    if session.id.trim().is_empty() {
        issues.error(Some("id"), "id is required and must be a string", None);
    }
    issues.check_subject(&session.subject);
    issues.check_duration(session.duration);
    if let Some(end_time) = session.end_time {
        issues.check_order(session.start_time, end_time);
    }

    issues.finish()
}

struct Issues {
    row: Option<usize>,
    found: Vec<ValidationIssue>,
}

impl Issues {
    const fn new(row: Option<usize>) -> Self {
        Self {
            row,
            found: Vec::new(),
        }
    }

    fn error(&mut self, column: Option<&str>, message: &str, value: Option<String>) {
        self.push(ValidationIssue::error(self.message(message)), column, value);
    }

    fn warning(&mut self, column: Option<&str>, message: &str, value: Option<String>) {
        self.push(ValidationIssue::warning(self.message(message)), column, value);
    }

    fn push(&mut self, issue: ValidationIssue, column: Option<&str>, value: Option<String>) {
        let mut issue = issue.at_row(self.row);
        if let Some(column) = column {
            issue = issue.in_column(column);
        }
        if let Some(value) = value {
            issue = issue.with_value(value);
        }
        self.found.push(issue);
    }

    fn message(&self, message: &str) -> String {
        self.row
            .map_or_else(|| message.to_string(), |row| format!("Row {row}: {message}"))
    }

    fn check_subject(&mut self, subject: &str) {
        if subject.trim().is_empty() {
            self.error(
                Some("subject"),
                "subject is required and must be text",
                Some(subject.to_string()),
            );
        }
    }

    fn check_duration(&mut self, duration: f64) {
        if !duration.is_finite() || duration <= 0.0 {
            self.error(
                Some("duration"),
                "duration must be a positive number",
                Some(duration.to_string()),
            );
        }
    }

    // Equal timestamps are legitimate, so only a strictly earlier end warns.
    fn check_order(&mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) {
        if end_time < start_time {
            self.warning(
                Some("endTime"),
                "endTime is earlier than startTime",
                Some(end_time.to_rfc3339()),
            );
        }
    }

    fn finish(self) -> Vec<ValidationIssue> {
        self.found
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
