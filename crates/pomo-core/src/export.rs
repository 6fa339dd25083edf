//! Session export as CSV or JSON, with optional filtering.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Session;
use crate::util::format_timestamp;

/// Version stamped into JSON export metadata
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// CSV column order; the import pipeline reads the same header.
pub const CSV_COLUMNS: [&str; 6] = ["id", "subject", "duration", "startTime", "endTime", "completed"];

/// Export output format shared by all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Inclusive start-time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_incomplete: bool,
    pub date_range: Option<DateRange>,
}

impl ExportOptions {
    pub const fn new(format: ExportFormat) -> Self {
        Self {
            format,
            include_incomplete: false,
            date_range: None,
        }
    }

    #[must_use]
    pub const fn including_incomplete(mut self, include_incomplete: bool) -> Self {
        self.include_incomplete = include_incomplete;
        self
    }

    #[must_use]
    pub const fn within(mut self, date_range: DateRange) -> Self {
        self.date_range = Some(date_range);
        self
    }
}

/// Informational header on JSON exports; never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub version: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ExportDocument<'a> {
    metadata: ExportMetadata,
    sessions: Vec<&'a Session>,
}

/// Drop incomplete sessions unless requested, then apply the date range.
pub fn filter_sessions<'a>(sessions: &'a [Session], options: &ExportOptions) -> Vec<&'a Session> {
    sessions
        .iter()
        .filter(|session| options.include_incomplete || session.completed)
        .filter(|session| {
            options
                .date_range
                .is_none_or(|range| range.contains(session.start_time))
        })
        .collect()
}

/// Render the filtered sessions in the requested format.
pub fn render_export(sessions: &[Session], options: &ExportOptions) -> Result<String> {
    let selected = filter_sessions(sessions, options);
    match options.format {
        ExportFormat::Csv => render_csv_export(&selected),
        ExportFormat::Json => render_json_export(selected, Utc::now()),
    }
}

/// Render sessions as CSV with a fixed header row.
pub fn render_csv_export(sessions: &[&Session]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for session in sessions {
        let duration = session.duration.to_string();
        let start_time = format_timestamp(&session.start_time);
        let end_time = session
            .end_time
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_default();
        writer.write_record([
            session.id.as_str(),
            session.subject.as_str(),
            duration.as_str(),
            start_time.as_str(),
            end_time.as_str(),
            if session.completed { "true" } else { "false" },
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::Storage(format!("failed to flush CSV export: {error}")))?;
    String::from_utf8(bytes)
        .map_err(|error| Error::InvalidInput(format!("CSV export is not UTF-8: {error}")))
}

/// Render sessions as pretty-printed JSON wrapped with export metadata.
pub fn render_json_export(sessions: Vec<&Session>, exported_at: DateTime<Utc>) -> Result<String> {
    let document = ExportDocument {
        metadata: ExportMetadata {
            exported_at,
            version: EXPORT_FORMAT_VERSION.to_string(),
            count: sessions.len(),
        },
        sessions,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Build a default file name embedding the export date.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "pomodoro-sessions-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(id: &str, subject: &str, start: &str, completed: bool) -> Session {
        let mut session = Session::new(subject, 25.0, start.parse().unwrap());
        session.id = id.to_string();
        session.completed = completed;
        session
    }

    fn fixtures() -> Vec<Session> {
        vec![
            session("a", "Math", "2024-03-01T09:00:00Z", true),
            session("b", "Reading", "2024-03-02T09:00:00Z", false),
            session("c", "History, modern", "2024-03-03T09:00:00Z", true)
                .with_end_time("2024-03-03T09:25:00Z".parse().unwrap()),
        ]
    }

    #[test]
    fn filter_drops_incomplete_by_default() {
        let sessions = fixtures();
        let options = ExportOptions::new(ExportFormat::Csv);
        let ids = filter_sessions(&sessions, &options)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let sessions = fixtures();
        let options = ExportOptions::new(ExportFormat::Csv)
            .including_incomplete(true)
            .within(DateRange {
                start: "2024-03-01T09:00:00Z".parse().unwrap(),
                end: "2024-03-02T09:00:00Z".parse().unwrap(),
            });
        let ids = filter_sessions(&sessions, &options)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn csv_has_fixed_columns_and_quotes_commas() {
        let sessions = fixtures();
        let rendered = render_export(&sessions, &ExportOptions::new(ExportFormat::Csv)).unwrap();
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "id,subject,duration,startTime,endTime,completed");
        assert_eq!(lines[1], "a,Math,25,2024-03-01T09:00:00Z,,true");
        assert_eq!(
            lines[2],
            "c,\"History, modern\",25,2024-03-03T09:00:00Z,2024-03-03T09:25:00Z,true"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_wraps_sessions_with_metadata() {
        let sessions = fixtures();
        let options = ExportOptions::new(ExportFormat::Json).including_incomplete(true);
        let rendered = render_export(&sessions, &options).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["metadata"]["count"], 3);
        assert_eq!(value["metadata"]["version"], EXPORT_FORMAT_VERSION);
        assert!(value["metadata"]["exportedAt"].is_string());
        assert_eq!(value["sessions"][1]["id"], "b");
    }

    #[test]
    fn suggested_export_file_name_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            suggested_export_file_name(ExportFormat::Csv, date),
            "pomodoro-sessions-2024-03-15.csv"
        );
        assert_eq!(
            suggested_export_file_name(ExportFormat::Json, date),
            "pomodoro-sessions-2024-03-15.json"
        );
    }

    #[test]
    fn csv_export_keeps_sub_millisecond_timestamps() {
        let start: DateTime<Utc> = "2026-10-19T03:18:17.377605064Z".parse().unwrap();
        let original = Session::new("Math", 25.0, start)
            .with_end_time(start + chrono::Duration::minutes(25))
            .mark_completed();

        let rendered = render_csv_export(&[&original]).unwrap();
        assert!(rendered.contains("2026-10-19T03:18:17.377605064Z"));

        let file = crate::import::ImportFile::new("export.csv", rendered);
        let preview = crate::import::parse_and_validate(&file, &[]).unwrap();
        assert_eq!(preview.sessions, vec![original]);
    }
}
