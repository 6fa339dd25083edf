use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use pomo_core::db::Database;
use pomo_core::export::DateRange;
use pomo_core::util::{compact_text, parse_timestamp};
use pomo_core::{Session, SessionStore, ValidationIssue};
use serde::Serialize;

use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    pub id: String,
    pub subject: String,
    pub duration: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
    pub relative_time: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &CliConfig) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("POMO_DB_PATH").map(PathBuf::from))
        .or_else(|| config.db_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pomo")
        .join("pomo.db")
}

pub fn open_store(db_path: &Path, config: &CliConfig) -> Result<SessionStore<Database>, CliError> {
    let db = Database::open(db_path)?.with_capacity(config.capacity_bytes());
    Ok(SessionStore::new(db))
}

pub fn normalize_subject(parts: &[String]) -> Result<String, CliError> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySubject)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_minutes(value: &str) -> Result<f64, CliError> {
    match value.trim().parse::<f64>() {
        Ok(minutes) if minutes.is_finite() && minutes > 0.0 => Ok(minutes),
        _ => Err(CliError::InvalidDuration(value.to_string())),
    }
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>, CliError> {
    parse_timestamp(value).ok_or_else(|| CliError::InvalidDate(value.to_string()))
}

/// Like [`parse_time`], but a bare date covers the whole of that day.
///
/// The inclusive end is the last nanosecond before the next local midnight,
/// the finest instant a timestamp can hold.
pub fn parse_range_end(value: &str) -> Result<DateTime<Utc>, CliError> {
    let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") else {
        return parse_time(value);
    };
    let next_day = date
        .succ_opt()
        .ok_or_else(|| CliError::InvalidDate(value.to_string()))?;
    Ok(parse_time(&next_day.to_string())? - Duration::nanoseconds(1))
}

/// Build an inclusive export window; an omitted bound is open.
pub fn date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>, CliError> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }

    let start = from.map_or(Ok(DateTime::<Utc>::MIN_UTC), parse_time)?;
    let end = to.map_or(Ok(DateTime::<Utc>::MAX_UTC), parse_range_end)?;
    if end < start {
        return Err(CliError::InvalidDate(format!(
            "range ends before it starts ({} > {})",
            from.unwrap_or_default(),
            to.unwrap_or_default()
        )));
    }
    Ok(Some(DateRange { start, end }))
}

/// Most recently recorded sessions first.
pub fn recent_sessions(sessions: &[Session], limit: usize) -> Vec<&Session> {
    sessions.iter().rev().take(limit).collect()
}

pub fn format_session_lines(sessions: &[&Session], now: DateTime<Utc>) -> Vec<String> {
    sessions
        .iter()
        .map(|session| {
            let short_id = session.id.chars().take(13).collect::<String>();
            let subject = subject_preview(&session.subject, 30);
            let started = session
                .start_time
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M");
            let length = format_minutes(session.duration);
            let status = if session.completed { "done" } else { "stopped" };
            let relative_time = format_relative_time(session.start_time, now);

            format!(
                "{short_id:<13}  {subject:<30}  {started}  {length:>7}  {status:<7}  {relative_time}"
            )
        })
        .collect()
}

pub fn session_to_list_item(session: &Session, now: DateTime<Utc>) -> SessionListItem {
    SessionListItem {
        id: session.id.clone(),
        subject: session.subject.clone(),
        duration: session.duration,
        start_time: session.start_time,
        end_time: session.end_time,
        completed: session.completed,
        relative_time: format_relative_time(session.start_time, now),
    }
}

pub fn subject_preview(subject: &str, max_chars: usize) -> String {
    let collapsed = subject.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as i64;
    if total < 60 {
        format!("{total}m")
    } else {
        format!("{}h {:02}m", total / 60, total % 60)
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_milliseconds();
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn format_issue_line(issue: &ValidationIssue) -> String {
    let severity = if issue.is_error() { "error" } else { "warning" };
    match issue.value.as_deref() {
        Some(value) if !value.is_empty() => {
            format!("{severity:<7}  {} (value: {})", issue.message, compact_text(value))
        }
        _ => format!("{severity:<7}  {}", issue.message),
    }
}
