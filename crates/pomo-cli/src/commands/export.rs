use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use pomo_core::export::{suggested_export_file_name, ExportFormat, ExportOptions};

use crate::cli;
use crate::commands::common::{date_range, open_store};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_export(
    format: Option<cli::ExportFormat>,
    output_path: Option<&Path>,
    include_incomplete: bool,
    from: Option<&str>,
    to: Option<&str>,
    db_path: &Path,
    config: &CliConfig,
) -> Result<(), CliError> {
    let format = format.map_or_else(|| config.export_format(), ExportFormat::from);
    let mut options = ExportOptions::new(format).including_incomplete(include_incomplete);
    if let Some(range) = date_range(from, to)? {
        options = options.within(range);
    }

    let rendered = open_store(db_path, config)?.export(&options)?;

    if let Some(path) = output_path {
        let target = export_target(path, format, Local::now().date_naive());
        std::fs::write(&target, rendered)?;
        println!("{}", target.display());
    } else if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }

    Ok(())
}

/// Write into `path` directly, or under a dated file name when it is a directory.
pub fn export_target(path: &Path, format: ExportFormat, date: NaiveDate) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_export_file_name(format, date))
    } else {
        path.to_path_buf()
    }
}
