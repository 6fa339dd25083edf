use std::path::Path;

use chrono::Utc;

use crate::commands::common::{
    format_session_lines, open_store, recent_sessions, session_to_list_item, SessionListItem,
};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_list(
    limit: usize,
    as_json: bool,
    db_path: &Path,
    config: &CliConfig,
) -> Result<(), CliError> {
    let sessions = open_store(db_path, config)?.load()?;
    let recent = recent_sessions(&sessions, limit);
    let now = Utc::now();

    if as_json {
        let json_items = recent
            .iter()
            .map(|session| session_to_list_item(session, now))
            .collect::<Vec<SessionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if recent.is_empty() {
        println!("No sessions recorded yet");
    } else {
        for line in format_session_lines(&recent, now) {
            println!("{line}");
        }
    }

    Ok(())
}
