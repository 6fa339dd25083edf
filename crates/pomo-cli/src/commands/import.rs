use std::path::Path;

use chrono::Local;
use pomo_core::import::{read_import_file, ImportMode, ImportPreview, MergeOutcome};

use crate::commands::common::{format_issue_line, open_store, subject_preview};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_validate(
    path: &Path,
    as_json: bool,
    db_path: &Path,
    config: &CliConfig,
) -> Result<(), CliError> {
    let file = read_import_file(path).await?;
    let preview = open_store(db_path, config)?.preview_import(&file)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        for line in format_preview_lines(&preview) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_import(
    path: &Path,
    mode: ImportMode,
    skip_invalid: bool,
    db_path: &Path,
    config: &CliConfig,
) -> Result<(), CliError> {
    let file = read_import_file(path).await?;
    let store = open_store(db_path, config)?;
    let preview = store.preview_import(&file)?;

    for line in format_preview_lines(&preview) {
        println!("{line}");
    }

    let errors = preview.error_count();
    if errors > 0 && !skip_invalid {
        return Err(CliError::ImportHasErrors(errors));
    }
    if preview.sessions.is_empty() {
        println!("Nothing to import");
        return Ok(());
    }

    let outcome = store.commit_import(preview.sessions, mode)?;
    println!("{}", format_outcome_line(&outcome));
    Ok(())
}

pub fn format_preview_lines(preview: &ImportPreview) -> Vec<String> {
    let mut lines = vec![format!(
        "Rows: {} ({} valid, {} errors, {} warnings)",
        preview.total_rows,
        preview.valid_rows,
        preview.error_count(),
        preview.warning_count()
    )];

    if preview.generated_ids > 0 {
        lines.push(format!("Generated ids: {}", preview.generated_ids));
    }

    if !preview.duplicates.is_empty() {
        lines.push(format!("Possible duplicates: {}", preview.duplicates.len()));
        for duplicate in &preview.duplicates {
            lines.push(format!(
                "  {} at {} matches stored session {}",
                subject_preview(&duplicate.candidate.subject, 30),
                duplicate
                    .candidate
                    .start_time
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
                duplicate.existing.id
            ));
        }
    }

    lines.extend(preview.issues.iter().map(format_issue_line));
    lines
}

pub fn format_outcome_line(outcome: &MergeOutcome) -> String {
    format!(
        "Imported {} sessions ({} duplicates skipped, {} ids reassigned); {} stored",
        outcome.added,
        outcome.skipped_duplicates,
        outcome.reassigned_ids,
        outcome.sessions.len()
    )
}
