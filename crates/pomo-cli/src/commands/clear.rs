use std::path::Path;

use crate::commands::common::open_store;
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_clear(confirmed: bool, db_path: &Path, config: &CliConfig) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ClearNotConfirmed);
    }

    open_store(db_path, config)?.clear_all()?;
    println!("Cleared all sessions");
    Ok(())
}
