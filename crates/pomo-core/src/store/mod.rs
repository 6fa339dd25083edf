//! Session store: the single entry point UI collaborators use to load, save,
//! aggregate, import and export sessions.
//!
//! Construct one store per running application and pass it by reference.

mod envelope;
mod migration;

pub use envelope::{
    checksum, decode, DecodedEnvelope, StorageEnvelope, StorageMetadata, LEGACY_STORAGE_KEY,
    STORAGE_KEY, STORAGE_VERSION,
};
pub use migration::{migrate, retire_legacy};

use chrono::{DateTime, Local, Utc};
use serde_json::Value;

use crate::db::{KeyValueStorage, StorageUsage};
use crate::error::{Error, Result};
use crate::export::{render_export, ExportOptions};
use crate::import::{
    merge_import, parse_and_validate, ImportFile, ImportMode, ImportPreview, MergeOutcome,
};
use crate::models::{has_blocking_errors, validate_candidate, validate_session, Session};
use crate::stats::{compute_rollups, compute_statistics, DataStatistics, Rollups};

/// Outcome of a load, including the problems it tolerated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub sessions: Vec<Session>,
    /// Stored checksum absent or different from the recomputed one
    pub checksum_mismatch: bool,
    /// Stored records skipped for failing validation
    pub dropped_records: usize,
}

impl LoadReport {
    fn from_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            ..Self::default()
        }
    }
}

/// Checksummed session store over a key-value medium
pub struct SessionStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> SessionStore<S> {
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get the underlying storage medium
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Load all valid sessions in insertion order.
    ///
    /// A missing envelope, or one without its `metadata` or `sessions`
    /// field, falls back to legacy migration and then to an empty list.
    /// Incomplete metadata or a checksum mismatch is logged and the data is
    /// returned as stored. Invalid records are skipped; storage itself is not
    /// rewritten. Only a failing medium read is an error.
    pub fn load(&self) -> Result<Vec<Session>> {
        Ok(self.load_report()?.sessions)
    }

    /// Like [`Self::load`], also reporting integrity problems it tolerated.
    pub fn load_report(&self) -> Result<LoadReport> {
        let Some(raw) = self.storage.get(STORAGE_KEY)? else {
            return Ok(LoadReport::from_sessions(self.recover_from_legacy()));
        };

        let decoded = match decode(&raw) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!("{}; falling back to legacy data", error);
                return Ok(LoadReport::from_sessions(self.recover_from_legacy()));
            }
        };

        if decoded.metadata.is_none() {
            tracing::warn!("Session metadata is incomplete; loading records anyway");
        }
        let checksum_mismatch = !decoded.checksum_matches();
        if checksum_mismatch {
            tracing::warn!(
                "Session data checksum mismatch (stored {}, computed {}); data may be corrupted",
                decoded.stored_checksum.as_deref().unwrap_or("none"),
                decoded.actual_checksum
            );
        }

        let sessions = accept_records(&decoded.records, "stored");
        Ok(LoadReport {
            dropped_records: decoded.records.len() - sessions.len(),
            sessions,
            checksum_mismatch,
        })
    }

    /// Replace the stored sessions, all or nothing.
    ///
    /// Every record is validated first; any blocking error rejects the whole
    /// batch with [`Error::Validation`] and storage is left unchanged. A full
    /// medium surfaces as [`Error::CapacityExceeded`].
    pub fn save(&self, sessions: &[Session]) -> Result<()> {
        let errors = sessions
            .iter()
            .enumerate()
            .flat_map(|(index, session)| validate_session(session, Some(index + 1)))
            .filter(|issue| issue.is_error())
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let envelope = StorageEnvelope::seal(sessions.to_vec(), Utc::now())?;
        self.storage.set(STORAGE_KEY, &envelope.to_json()?)?;
        tracing::debug!(
            "Saved {} sessions (checksum {})",
            envelope.metadata.session_count,
            envelope.metadata.data_checksum
        );
        Ok(())
    }

    /// Append one session, typically handed over by the timer on completion.
    pub fn add_session(&self, session: Session) -> Result<Session> {
        let mut sessions = self.load()?;
        sessions.push(session.clone());
        self.save(&sessions)?;
        Ok(session)
    }

    /// Metadata of the stored envelope, if one is readable.
    pub fn metadata(&self) -> Result<Option<StorageMetadata>> {
        let Some(raw) = self.storage.get(STORAGE_KEY)? else {
            return Ok(None);
        };
        Ok(decode(&raw).ok().and_then(|decoded| decoded.metadata))
    }

    pub fn usage(&self) -> Result<StorageUsage> {
        self.storage.usage()
    }

    pub fn statistics(&self) -> Result<DataStatistics> {
        Ok(compute_statistics(&self.load()?))
    }

    pub fn rollups(&self, now: DateTime<Local>) -> Result<Rollups> {
        Ok(compute_rollups(&self.load()?, now))
    }

    pub fn export(&self, options: &ExportOptions) -> Result<String> {
        render_export(&self.load()?, options)
    }

    /// Validate an import file against the current sessions. Does not write.
    pub fn preview_import(&self, file: &ImportFile) -> Result<ImportPreview> {
        parse_and_validate(file, &self.load()?)
    }

    /// Merge previewed candidates into storage.
    ///
    /// The merged list is saved through [`Self::save`]; a failure there is
    /// wrapped in [`Error::ImportCommit`].
    pub fn commit_import(
        &self,
        candidates: Vec<Session>,
        mode: ImportMode,
    ) -> Result<MergeOutcome> {
        let existing = self.load()?;
        let outcome = merge_import(candidates, existing, mode);

        self.save(&outcome.sessions)
            .map_err(|error| Error::ImportCommit(Box::new(error)))?;
        tracing::info!(
            "Imported {} sessions ({} duplicates skipped, {} ids reassigned)",
            outcome.added,
            outcome.skipped_duplicates,
            outcome.reassigned_ids
        );
        Ok(outcome)
    }

    /// Remove all stored sessions, including any legacy data.
    pub fn clear_all(&self) -> Result<()> {
        self.storage.remove(STORAGE_KEY)?;
        self.storage.remove(LEGACY_STORAGE_KEY)?;
        tracing::info!("Cleared all session data");
        Ok(())
    }

    fn recover_from_legacy(&self) -> Vec<Session> {
        let migrated = migrate(&self.storage);
        if migrated.is_empty() {
            return migrated;
        }

        match self.save(&migrated) {
            Ok(()) => {
                retire_legacy(&self.storage);
                tracing::info!("Migrated {} legacy sessions", migrated.len());
            }
            Err(error) => {
                tracing::warn!(
                    "Could not persist {} migrated sessions; legacy data kept: {}",
                    migrated.len(),
                    error
                );
            }
        }
        migrated
    }
}

/// Validate raw records (1-based rows, ids required) and keep the error-free
/// ones. Dropped records are logged, never returned.
pub(crate) fn accept_records(records: &[Value], source: &str) -> Vec<Session> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let issues = validate_candidate(record, Some(index + 1), false);
            if has_blocking_errors(&issues) {
                for issue in issues.iter().filter(|issue| issue.is_error()) {
                    tracing::debug!("Skipping {} session: {}", source, issue.message);
                }
                tracing::warn!("Skipped invalid {} session at position {}", source, index + 1);
                return None;
            }
            Session::from_candidate(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MemoryStorage};
    use crate::export::ExportFormat;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> SessionStore<MemoryStorage> {
        SessionStore::new(MemoryStorage::new())
    }

    fn sample_sessions() -> Vec<Session> {
        let start: DateTime<Utc> = "2024-03-01T09:00:00.123456Z".parse().unwrap();
        vec![
            Session::new("Math", 25.0, start)
                .with_end_time(start + Duration::minutes(25))
                .mark_completed(),
            Session::new("Reading", 12.5, start - Duration::days(3)),
            Session::new("History, modern", 50.0, start + Duration::hours(2)).mark_completed(),
        ]
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let store = store();
        let sessions = sample_sessions();
        store.save(&sessions).unwrap();

        assert_eq!(store.load().unwrap(), sessions);

        let metadata = store.metadata().unwrap().unwrap();
        assert_eq!(metadata.session_count, 3);
        assert_eq!(metadata.version, STORAGE_VERSION);
    }

    #[test]
    fn load_on_empty_storage_is_empty() {
        assert!(store().load().unwrap().is_empty());
        assert_eq!(store().metadata().unwrap(), None);
    }

    #[test]
    fn out_of_band_edit_triggers_checksum_mismatch_but_still_loads() {
        let store = store();
        store.save(&sample_sessions()).unwrap();

        let raw = store.storage().get(STORAGE_KEY).unwrap().unwrap();
        let tampered = raw.replace("Reading", "Readinh");
        store.storage().set(STORAGE_KEY, &tampered).unwrap();

        let report = store.load_report().unwrap();
        assert!(report.checksum_mismatch);
        assert_eq!(report.dropped_records, 0);
        assert_eq!(report.sessions.len(), 3);
        assert_eq!(report.sessions[1].subject, "Readinh");
    }

    #[test]
    fn clean_load_reports_no_integrity_problems() {
        let store = store();
        store.save(&sample_sessions()).unwrap();

        let report = store.load_report().unwrap();
        assert!(!report.checksum_mismatch);
        assert_eq!(report.dropped_records, 0);
        assert_eq!(report.sessions, store.load().unwrap());
    }

    #[test]
    fn missing_checksum_loads_records_and_next_save_keeps_them() {
        let store = store();
        let sessions = sample_sessions();
        store.save(&sessions).unwrap();

        let raw = store.storage().get(STORAGE_KEY).unwrap().unwrap();
        let mut envelope: Value = serde_json::from_str(&raw).unwrap();
        envelope["metadata"]
            .as_object_mut()
            .unwrap()
            .remove("dataChecksum");
        store
            .storage()
            .set(STORAGE_KEY, &envelope.to_string())
            .unwrap();

        let report = store.load_report().unwrap();
        assert!(report.checksum_mismatch);
        assert_eq!(report.sessions, sessions);
        assert_eq!(store.metadata().unwrap(), None);

        store.add_session(Session::finished_now("New", 25.0)).unwrap();
        let subjects = store
            .load()
            .unwrap()
            .into_iter()
            .map(|session| session.subject)
            .collect::<Vec<_>>();
        assert_eq!(subjects, vec!["Math", "Reading", "History, modern", "New"]);
        assert!(store.metadata().unwrap().is_some());
    }

    #[test]
    fn unreadable_last_modified_still_loads_records() {
        let store = store();
        store.save(&sample_sessions()).unwrap();

        let raw = store.storage().get(STORAGE_KEY).unwrap().unwrap();
        let mut envelope: Value = serde_json::from_str(&raw).unwrap();
        envelope["metadata"]["lastModified"] = json!("last tuesday");
        store
            .storage()
            .set(STORAGE_KEY, &envelope.to_string())
            .unwrap();

        let report = store.load_report().unwrap();
        assert!(!report.checksum_mismatch);
        assert_eq!(report.sessions.len(), 3);
    }

    #[test]
    fn invalid_batch_leaves_storage_untouched() {
        let store = store();
        store.save(&sample_sessions()).unwrap();
        let before = store.storage().get(STORAGE_KEY).unwrap();

        let mut batch = sample_sessions();
        batch[1].duration = -5.0;
        let error = store.save(&batch).unwrap_err();

        match error {
            Error::Validation(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].row, Some(2));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.storage().get(STORAGE_KEY).unwrap(), before);
    }

    #[test]
    fn invalid_stored_records_are_dropped_on_load_only() {
        let store = store();
        store.save(&sample_sessions()).unwrap();

        let raw = store.storage().get(STORAGE_KEY).unwrap().unwrap();
        let mut envelope: Value = serde_json::from_str(&raw).unwrap();
        envelope["sessions"][0]["duration"] = json!(0);
        let edited = envelope.to_string();
        store.storage().set(STORAGE_KEY, &edited).unwrap();

        let report = store.load_report().unwrap();
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.dropped_records, 1);
        assert_eq!(store.storage().get(STORAGE_KEY).unwrap(), Some(edited));
    }

    #[test]
    fn capacity_rejection_is_distinguishable() {
        let store = SessionStore::new(MemoryStorage::with_capacity(600));
        let sessions = (0..20)
            .map(|index| Session::finished_now(format!("Subject {index}"), 25.0))
            .collect::<Vec<_>>();

        let error = store.save(&sessions).unwrap_err();
        assert!(matches!(error, Error::CapacityExceeded { .. }));
        assert!(error.is_capacity());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn sqlite_capacity_rejection_is_distinguishable() {
        let store = SessionStore::new(Database::open_in_memory().unwrap().with_capacity(600));
        let sessions = (0..20)
            .map(|index| Session::finished_now(format!("Subject {index}"), 25.0))
            .collect::<Vec<_>>();

        assert!(store.save(&sessions).unwrap_err().is_capacity());
    }

    #[test]
    fn legacy_data_is_migrated_once() {
        let store = store();
        let legacy = json!([
            {"id": "1", "subject": "Math", "duration": 25, "startTime": "2024-03-01T09:00:00Z", "completed": true},
            {"id": "2", "subject": "Math", "duration": -1, "startTime": "2024-03-01T10:00:00Z", "completed": true}
        ]);
        store
            .storage()
            .set(LEGACY_STORAGE_KEY, &legacy.to_string())
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(store.storage().get(LEGACY_STORAGE_KEY).unwrap(), None);
        assert!(store.metadata().unwrap().is_some());
        assert_eq!(store.load().unwrap(), loaded);
    }

    #[test]
    fn malformed_envelope_falls_back_to_legacy_then_empty() {
        let store = store();
        store.storage().set(STORAGE_KEY, r#"{"sessions": []}"#).unwrap();
        assert!(store.load().unwrap().is_empty());

        store
            .storage()
            .set(
                LEGACY_STORAGE_KEY,
                r#"[{"id": "1", "subject": "Math", "duration": 25, "startTime": "2024-03-01T09:00:00Z", "completed": true}]"#,
            )
            .unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
        assert!(store.metadata().unwrap().is_some());
    }

    #[test]
    fn failed_migration_save_keeps_legacy_key() {
        let store = SessionStore::new(MemoryStorage::with_capacity(200));
        let legacy = r#"[{"id": "1", "subject": "Math", "duration": 25, "startTime": "2024-03-01T09:00:00Z", "completed": true}]"#;
        store.storage().set(LEGACY_STORAGE_KEY, legacy).unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
        assert!(store.storage().get(LEGACY_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn add_session_appends() {
        let store = store();
        store.save(&sample_sessions()).unwrap();
        let added = store.add_session(Session::finished_now("Math", 25.0)).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[3], added);
    }

    #[test]
    fn clear_all_removes_everything() {
        let store = store();
        store.save(&sample_sessions()).unwrap();
        store.storage().set(LEGACY_STORAGE_KEY, "[]").unwrap();

        store.clear_all().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.usage().unwrap().used_bytes, 0);
    }

    #[test]
    fn export_then_reimport_skips_everything_as_duplicates() {
        let store = store();
        let sessions = sample_sessions();
        store.save(&sessions).unwrap();

        let options = ExportOptions::new(ExportFormat::Csv).including_incomplete(true);
        let csv = store.export(&options).unwrap();
        let preview = store
            .preview_import(&ImportFile::new("export.csv", csv.into_bytes()))
            .unwrap();
        assert_eq!(preview.valid_rows, 3);
        assert_eq!(preview.duplicates.len(), 3);

        let outcome = store
            .commit_import(preview.sessions, ImportMode::AddSkipDuplicates)
            .unwrap();
        assert_eq!(outcome.added, 0);
        assert_eq!(store.load().unwrap(), sessions);
    }

    #[test]
    fn commit_failure_is_reported_as_import_commit() {
        let store = SessionStore::new(MemoryStorage::with_capacity(1200));
        store.save(&sample_sessions()).unwrap();
        let before = store.load().unwrap();

        let candidates = (0..20)
            .map(|index| Session::finished_now(format!("Imported {index}"), 25.0))
            .collect::<Vec<_>>();
        let error = store
            .commit_import(candidates, ImportMode::AddKeepDuplicates)
            .unwrap_err();

        assert!(matches!(error, Error::ImportCommit(_)));
        assert!(error.is_capacity());
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn statistics_and_rollups_read_through_load() {
        let store = store();
        store.add_session(Session::finished_now("Math", 25.0)).unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(store.rollups(Local::now()).unwrap().weekly, 1);
    }
}
