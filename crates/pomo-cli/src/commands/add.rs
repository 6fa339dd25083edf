use std::path::Path;

use chrono::Duration;
use pomo_core::db::KeyValueStorage;
use pomo_core::{Session, SessionStore};

use crate::commands::common::{normalize_subject, open_store, parse_minutes, parse_time};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_add(
    subject_parts: &[String],
    minutes: &str,
    start: Option<&str>,
    incomplete: bool,
    db_path: &Path,
    config: &CliConfig,
) -> Result<(), CliError> {
    let store = open_store(db_path, config)?;
    let session = record_session(&store, subject_parts, minutes, start, incomplete)?;

    println!("{}", session.id);
    Ok(())
}

/// Build a session from command-line input and append it to `store`.
///
/// Without an explicit start the session is taken to have just finished.
pub fn record_session<S: KeyValueStorage>(
    store: &SessionStore<S>,
    subject_parts: &[String],
    minutes: &str,
    start: Option<&str>,
    incomplete: bool,
) -> Result<Session, CliError> {
    let subject = normalize_subject(subject_parts)?;
    let minutes = parse_minutes(minutes)?;

    let mut session = match start {
        Some(start) => {
            let start_time = parse_time(start)?;
            #[allow(clippy::cast_possible_truncation)]
            let elapsed = Duration::milliseconds((minutes * 60_000.0).round() as i64);
            Session::new(subject, minutes, start_time)
                .with_end_time(start_time + elapsed)
                .mark_completed()
        }
        None => Session::finished_now(subject, minutes),
    };
    session.completed = !incomplete;

    Ok(store.add_session(session)?)
}
