//! CSV import: file checks, row coercion and validation, duplicate detection.
//!
//! Parsing produces an [`ImportPreview`] and never touches storage. Committing
//! a preview is a separate step (see [`merge_import`] and
//! [`SessionStore::commit_import`](crate::store::SessionStore::commit_import)).

mod commit;
mod duplicates;

pub use commit::{merge_import, ImportMode, MergeOutcome};
pub use duplicates::{find_duplicates, is_duplicate, DuplicateMatch, DUPLICATE_WINDOW_SECONDS};

use std::collections::HashSet;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{
    generate_session_id, has_blocking_errors, validate_candidate, Session, ValidationIssue,
};

/// Largest accepted import file (1 MiB)
pub const MAX_IMPORT_BYTES: u64 = 1024 * 1024;

/// Columns every import file must carry; `id` and `endTime` are optional.
pub const REQUIRED_COLUMNS: [&str; 4] = ["subject", "duration", "startTime", "completed"];

const CSV_MEDIA_TYPES: [&str; 2] = ["text/csv", "application/csv"];

/// Full contents of a user-supplied import file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

/// Uncommitted result of validating an import file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub issues: Vec<ValidationIssue>,
    /// Every valid candidate, in file order
    pub sessions: Vec<Session>,
    pub duplicates: Vec<DuplicateMatch>,
    pub generated_ids: usize,
}

impl ImportPreview {
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }
}

/// Reject files that are too large or not CSV, before reading any rows.
///
/// The type check passes on a `.csv` extension (any case) or a declared CSV
/// media type.
pub fn validate_import_file(file_name: &str, size: u64, media_type: Option<&str>) -> Result<()> {
    if size > MAX_IMPORT_BYTES {
        return Err(Error::FileTooLarge {
            size,
            max: MAX_IMPORT_BYTES,
        });
    }

    let has_csv_extension = Path::new(file_name)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
    let has_csv_media_type = media_type.is_some_and(|media_type| {
        let essence = media_type.split(';').next().unwrap_or("").trim();
        CSV_MEDIA_TYPES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(essence))
    });

    if has_csv_extension || has_csv_media_type {
        Ok(())
    } else {
        Err(Error::UnsupportedFileType(file_name.to_string()))
    }
}

/// Read an import file from disk.
///
/// The size limit is enforced from file metadata before the contents are
/// read; any I/O failure rejects the whole import.
pub async fn read_import_file(path: impl AsRef<Path>) -> Result<ImportFile> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|error| Error::FileUnreadable(format!("{}: {error}", path.display())))?;
    validate_import_file(&file_name, metadata.len(), None)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|error| Error::FileUnreadable(format!("{}: {error}", path.display())))?;
    let file = ImportFile::new(file_name, bytes);
    validate_import_file(&file.file_name, file.size(), None)?;
    Ok(file)
}

/// Parse and validate an import file against the sessions already stored.
///
/// Row numbers in issues are 1-based and count the header, so the first data
/// row is row 2. Only rows without errors become candidates.
pub fn parse_and_validate(file: &ImportFile, existing: &[Session]) -> Result<ImportPreview> {
    validate_import_file(&file.file_name, file.size(), file.media_type.as_deref())?;

    let text = std::str::from_utf8(&file.bytes)
        .map_err(|error| Error::FileUnreadable(format!("file is not UTF-8 text: {error}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    let columns = match Columns::locate(&headers) {
        Ok(columns) => columns,
        Err(missing) => {
            let listed = missing.join(", ");
            let issue = ValidationIssue::error(format!("Missing required columns: {listed}"))
                .in_column(listed);
            return Ok(ImportPreview {
                total_rows: records.len(),
                issues: vec![issue],
                ..ImportPreview::default()
            });
        }
    };

    let mut preview = ImportPreview {
        total_rows: records.len(),
        ..ImportPreview::default()
    };
    let mut used_ids = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let row = index + 2;
        let candidate = columns.candidate(record, row, &mut used_ids, &mut preview);

        let row_issues = validate_candidate(&candidate, Some(row), true);
        let blocked = has_blocking_errors(&row_issues);
        preview.issues.extend(row_issues);

        if !blocked {
            if let Some(session) = Session::from_candidate(&candidate) {
                preview.sessions.push(session);
            }
        }
    }

    preview.valid_rows = preview.sessions.len();
    preview.duplicates = find_duplicates(&preview.sessions, existing);
    tracing::debug!(
        "Parsed import '{}': {} of {} rows valid, {} duplicates",
        file.file_name,
        preview.valid_rows,
        preview.total_rows,
        preview.duplicates.len()
    );
    Ok(preview)
}

/// Column positions resolved from the header row
struct Columns {
    id: Option<usize>,
    subject: usize,
    duration: usize,
    start_time: usize,
    end_time: Option<usize>,
    completed: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> std::result::Result<Self, Vec<&'static str>> {
        let position = |name: &str| headers.iter().position(|header| header == name);

        let missing = REQUIRED_COLUMNS
            .into_iter()
            .filter(|&name| position(name).is_none())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            id: position("id"),
            subject: position("subject").unwrap_or_default(),
            duration: position("duration").unwrap_or_default(),
            start_time: position("startTime").unwrap_or_default(),
            end_time: position("endTime"),
            completed: position("completed").unwrap_or_default(),
        })
    }

    /// Coerce one row into a JSON-shaped candidate, assigning an id.
    fn candidate(
        &self,
        record: &StringRecord,
        row: usize,
        used_ids: &mut HashSet<String>,
        preview: &mut ImportPreview,
    ) -> Value {
        let raw_id = self.id.map_or("", |index| field(record, index));
        let mut id = if raw_id.is_empty() {
            preview.generated_ids += 1;
            generate_session_id()
        } else {
            raw_id.to_string()
        };

        if !used_ids.insert(id.clone()) {
            preview.issues.push(
                ValidationIssue::warning(format!(
                    "Row {row}: id '{id}' already appears earlier in this file; a new id was generated"
                ))
                .at_row(Some(row))
                .in_column("id")
                .with_value(id.clone()),
            );
            id = generate_session_id();
            preview.generated_ids += 1;
            used_ids.insert(id.clone());
        }

        let mut candidate = json!({
            "id": id,
            "subject": field(record, self.subject),
            "duration": coerce_number(field(record, self.duration)),
            "startTime": field(record, self.start_time),
            "completed": coerce_bool(field(record, self.completed)),
        });

        let end_time = self.end_time.map_or("", |index| field(record, index));
        if !end_time.is_empty() {
            candidate["endTime"] = Value::String(end_time.to_string());
        }
        candidate
    }
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

/// Unparseable numeric text becomes 0 and fails duration validation later.
fn coerce_number(raw: &str) -> Value {
    let number = raw.parse::<f64>().unwrap_or(0.0);
    serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
}

/// Only the literal `true` is true.
fn coerce_bool(raw: &str) -> bool {
    raw == "true"
}
