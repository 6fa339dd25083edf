//! One-shot upgrade from the unversioned legacy array.

use serde_json::Value;

use super::envelope::LEGACY_STORAGE_KEY;
use super::accept_records;
use crate::db::KeyValueStorage;
use crate::models::Session;

/// Read and validate legacy sessions. Never fails: any problem is logged
/// and yields an empty list.
///
/// The legacy key is left in place; call [`retire_legacy`] once the
/// migrated records have been durably written.
pub fn migrate<S: KeyValueStorage>(storage: &S) -> Vec<Session> {
    let raw = match storage.get(LEGACY_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(error) => {
            tracing::warn!("Could not read legacy sessions: {}", error);
            return Vec::new();
        }
    };

    let records = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            tracing::warn!("Legacy sessions are not an array; skipping migration");
            return Vec::new();
        }
        Err(error) => {
            tracing::warn!("Legacy sessions are not valid JSON: {}", error);
            return Vec::new();
        }
    };

    let total = records.len();
    let sessions = accept_records(&records, "legacy");
    tracing::info!(
        "Read {} of {} legacy sessions for migration",
        sessions.len(),
        total
    );
    sessions
}

/// Delete the legacy key after a successful migration.
pub fn retire_legacy<S: KeyValueStorage>(storage: &S) {
    if let Err(error) = storage.remove(LEGACY_STORAGE_KEY) {
        tracing::warn!("Could not remove legacy sessions after migration: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use serde_json::json;

    #[test]
    fn missing_legacy_key_yields_nothing() {
        let storage = MemoryStorage::new();
        assert!(migrate(&storage).is_empty());
    }

    #[test]
    fn keeps_only_valid_legacy_records() {
        let storage = MemoryStorage::new();
        let legacy = json!([
            {"id": "1", "subject": "Math", "duration": 25, "startTime": "2024-03-01T09:00:00Z", "completed": true},
            {"id": "2", "subject": "", "duration": 25, "startTime": "2024-03-01T10:00:00Z", "completed": true},
            {"subject": "No id", "duration": 25, "startTime": "2024-03-01T11:00:00Z", "completed": true}
        ]);
        storage
            .set(LEGACY_STORAGE_KEY, &legacy.to_string())
            .unwrap();

        let sessions = migrate(&storage);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "1");
        assert!(storage.get(LEGACY_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn garbage_legacy_data_is_swallowed() {
        let storage = MemoryStorage::new();
        storage.set(LEGACY_STORAGE_KEY, "{not json").unwrap();
        assert!(migrate(&storage).is_empty());

        storage.set(LEGACY_STORAGE_KEY, r#"{"a": 1}"#).unwrap();
        assert!(migrate(&storage).is_empty());
    }

    #[test]
    fn migration_is_idempotent_once_retired() {
        let storage = MemoryStorage::new();
        storage
            .set(
                LEGACY_STORAGE_KEY,
                r#"[{"id": "1", "subject": "Math", "duration": 25, "startTime": "2024-03-01T09:00:00Z", "completed": true}]"#,
            )
            .unwrap();

        assert_eq!(migrate(&storage).len(), 1);
        retire_legacy(&storage);
        assert!(migrate(&storage).is_empty());
        assert!(migrate(&storage).is_empty());
    }
}
