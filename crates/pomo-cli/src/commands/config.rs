use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{self, ConfigCommands};
use crate::commands::common::resolve_db_path;
use crate::config::{config_path, CliConfig};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub capacity_bytes: usize,
    pub export_format: pomo_core::export::ExportFormat,
}

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            db_path,
            capacity_bytes,
            export_format,
        } => run_config_init(db_path, capacity_bytes, export_format),
        ConfigCommands::Show { json } => run_config_show(json),
    }
}

pub fn run_config_init(
    db_path: Option<PathBuf>,
    capacity_bytes: Option<usize>,
    export_format: Option<cli::ExportFormat>,
) -> Result<(), CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let config = apply_config_init(config, db_path, capacity_bytes, export_format);
    let path = config.save().map_err(CliError::Config)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Overlay explicitly given settings onto `config`; omitted ones are kept.
pub fn apply_config_init(
    mut config: CliConfig,
    db_path: Option<PathBuf>,
    capacity_bytes: Option<usize>,
    export_format: Option<cli::ExportFormat>,
) -> CliConfig {
    if let Some(db_path) = db_path {
        config.db_path = Some(db_path.display().to_string());
    }
    if capacity_bytes.is_some() {
        config.capacity_bytes = capacity_bytes;
    }
    if let Some(format) = export_format {
        config.default_export_format = Some(format.into());
    }
    config
}

pub fn run_config_show(as_json: bool) -> Result<(), CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let effective = EffectiveConfig {
        config_path: config_path(),
        db_path: resolve_db_path(None, &config),
        capacity_bytes: config.capacity_bytes(),
        export_format: config.export_format(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        println!("Config file: {}", effective.config_path.display());
        println!("Database: {}", effective.db_path.display());
        println!("Capacity: {} bytes", effective.capacity_bytes);
        println!("Export format: {}", effective.export_format.extension());
    }

    Ok(())
}
