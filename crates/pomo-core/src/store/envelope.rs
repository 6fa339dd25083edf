//! Versioned, checksummed container for the persisted session list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Session;
use crate::util::fnv1a_hex;

/// Key holding the current-format envelope
pub const STORAGE_KEY: &str = "pomodoro-sessions-v2";
/// Key holding the unversioned legacy array
pub const LEGACY_STORAGE_KEY: &str = "pomodoro-sessions";
/// Envelope format version written on save
pub const STORAGE_VERSION: &str = "2.0";

/// Envelope header recomputed on every save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMetadata {
    pub version: String,
    pub last_modified: DateTime<Utc>,
    pub session_count: usize,
    pub data_checksum: String,
}

/// The persisted container: metadata plus sessions in insertion order
#[derive(Debug, Clone, Serialize)]
pub struct StorageEnvelope {
    pub metadata: StorageMetadata,
    pub sessions: Vec<Session>,
}

impl StorageEnvelope {
    /// Wrap `sessions` with freshly computed count, timestamp and checksum.
    pub fn seal(sessions: Vec<Session>, now: DateTime<Utc>) -> Result<Self> {
        let data_checksum = checksum(&serde_json::to_value(&sessions)?)?;
        Ok(Self {
            metadata: StorageMetadata {
                version: STORAGE_VERSION.to_string(),
                last_modified: now,
                session_count: sessions.len(),
                data_checksum,
            },
            sessions,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A stored envelope whose records have not been validated yet.
#[derive(Debug, Clone)]
pub struct DecodedEnvelope {
    /// Header as stored; `None` when any field is missing or unreadable
    pub metadata: Option<StorageMetadata>,
    /// `dataChecksum` as stored, read independently of the other fields
    pub stored_checksum: Option<String>,
    pub records: Vec<Value>,
    /// Checksum recomputed over the records exactly as stored
    pub actual_checksum: String,
}

impl DecodedEnvelope {
    /// An absent or unreadable stored checksum counts as a mismatch.
    pub fn checksum_matches(&self) -> bool {
        self.stored_checksum.as_deref() == Some(self.actual_checksum.as_str())
    }
}

/// Parse the raw stored text into metadata and untyped records.
///
/// Only unparseable JSON, a missing `metadata` or `sessions` field, or a
/// non-array `sessions` is an [`Error::Format`]. Incomplete metadata is
/// reported through [`DecodedEnvelope::metadata`] and the checksum check.
pub fn decode(raw: &str) -> Result<DecodedEnvelope> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| Error::Format(format!("not valid JSON: {error}")))?;
    let Value::Object(mut envelope) = value else {
        return Err(Error::Format("envelope is not an object".into()));
    };

    let metadata = envelope
        .remove("metadata")
        .ok_or_else(|| Error::Format("missing metadata".into()))?;
    let sessions = envelope
        .remove("sessions")
        .ok_or_else(|| Error::Format("missing sessions".into()))?;

    let actual_checksum = checksum(&sessions)?;
    let Value::Array(records) = sessions else {
        return Err(Error::Format("sessions is not an array".into()));
    };

    let stored_checksum = metadata
        .get("dataChecksum")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let metadata = serde_json::from_value::<StorageMetadata>(metadata).ok();

    Ok(DecodedEnvelope {
        metadata,
        stored_checksum,
        records,
        actual_checksum,
    })
}

/// FNV-1a over the compact canonical JSON of the sessions array.
pub fn checksum(sessions: &Value) -> Result<String> {
    Ok(fnv1a_hex(serde_json::to_string(sessions)?.as_bytes()))
}
