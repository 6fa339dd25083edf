use std::path::Path;

use pomo_core::db::StorageUsage;
use pomo_core::store::StorageMetadata;
use serde::Serialize;

use crate::commands::common::open_store;
use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StorageInfo {
    pub db_path: String,
    pub metadata: Option<StorageMetadata>,
    pub usage: StorageUsage,
    pub checksum_mismatch: bool,
    pub dropped_records: usize,
}

pub fn run_info(as_json: bool, db_path: &Path, config: &CliConfig) -> Result<(), CliError> {
    let store = open_store(db_path, config)?;
    let report = store.load_report()?;
    let info = StorageInfo {
        db_path: db_path.display().to_string(),
        metadata: store.metadata()?,
        usage: store.usage()?,
        checksum_mismatch: report.checksum_mismatch,
        dropped_records: report.dropped_records,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        for line in format_info_lines(&info) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn format_info_lines(info: &StorageInfo) -> Vec<String> {
    let mut lines = vec![format!("Database: {}", info.db_path)];

    match &info.metadata {
        Some(metadata) => {
            lines.push(format!(
                "Format: v{}, {} sessions, checksum {}",
                metadata.version, metadata.session_count, metadata.data_checksum
            ));
            lines.push(format!("Last modified: {}", metadata.last_modified.to_rfc3339()));
        }
        None => lines.push("No readable metadata stored".to_string()),
    }

    if info.checksum_mismatch {
        lines.push("Warning: stored checksum does not match the session data".to_string());
    }
    if info.dropped_records > 0 {
        lines.push(format!(
            "Warning: {} stored sessions failed validation and are hidden",
            info.dropped_records
        ));
    }

    let used = format_bytes(info.usage.used_bytes);
    lines.push(match info.usage.capacity_bytes {
        Some(capacity) => format!("Used: {used} of {}", format_bytes(capacity)),
        None => format!("Used: {used}"),
    });
    lines
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
