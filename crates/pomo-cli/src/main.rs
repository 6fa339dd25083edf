//! Pomo CLI - Command-line interface for Pomodoro session history
//!
//! Record focus sessions, review statistics, and move history in and out as
//! CSV or JSON.

mod cli;
mod commands;
mod config;
mod error;

use clap::{CommandFactory, Parser};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::clear::run_clear;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::export::run_export;
use crate::commands::import::{run_import, run_validate};
use crate::commands::info::run_info;
use crate::commands::list::run_list;
use crate::commands::stats::run_stats;
use crate::config::CliConfig;
use crate::error::CliError;

const LOG_DIRECTIVES: [&str; 2] = ["pomo=info", "pomo_core=info"];

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if error.is_capacity() {
            eprintln!(
                "Hint: storage is full. Save a copy with `pomo export --output <DIR>`, then free space with `pomo clear --yes` or a larger `pomo config init --capacity-bytes`."
            );
        } else if error.is_file_input() {
            eprintln!("Hint: import files must be UTF-8 CSV with a .csv extension, at most 1 MiB.");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = CliConfig::load().map_err(CliError::Config)?;
    let db_path = resolve_db_path(cli.db_path, &config);

    match cli.command {
        Some(Commands::Add {
            subject,
            minutes,
            start,
            incomplete,
        }) => run_add(
            &subject,
            &minutes,
            start.as_deref(),
            incomplete,
            &db_path,
            &config,
        )?,
        Some(Commands::List { limit, json }) => run_list(limit, json, &db_path, &config)?,
        Some(Commands::Stats { json }) => run_stats(json, &db_path, &config)?,
        Some(Commands::Info { json }) => run_info(json, &db_path, &config)?,
        Some(Commands::Export {
            format,
            output,
            include_incomplete,
            from,
            to,
        }) => run_export(
            format,
            output.as_deref(),
            include_incomplete,
            from.as_deref(),
            to.as_deref(),
            &db_path,
            &config,
        )?,
        Some(Commands::Validate { path, json }) => {
            run_validate(&path, json, &db_path, &config).await?;
        }
        Some(Commands::Import {
            path,
            mode,
            skip_invalid,
        }) => run_import(&path, mode.into(), skip_invalid, &db_path, &config).await?,
        Some(Commands::Clear { yes }) => run_clear(yes, &db_path, &config)?,
        Some(Commands::Config { command }) => run_config(command)?,
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}

fn init_tracing() -> Result<(), CliError> {
    let mut filter = EnvFilter::from_default_env();
    for directive in LOG_DIRECTIVES {
        let directive = directive
            .parse::<Directive>()
            .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
