use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pomo_core::import::ImportMode;

#[derive(Parser)]
#[command(name = "pomo")]
#[command(about = "Track Pomodoro sessions from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a focus session
    #[command(alias = "log")]
    Add {
        /// What the session was spent on
        subject: Vec<String>,
        /// Session length in minutes
        #[arg(short, long, default_value = "25")]
        minutes: String,
        /// Start time (defaults to `minutes` ago)
        #[arg(long, value_name = "TIME")]
        start: Option<String>,
        /// Record the session as abandoned
        #[arg(long)]
        incomplete: bool,
    },
    /// List recent sessions
    List {
        /// Number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily, weekly and monthly counts and per-subject totals
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show storage metadata and space usage
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export sessions
    Export {
        /// Export format (falls back to the configured default, then CSV)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Include sessions that were not completed
        #[arg(long)]
        include_incomplete: bool,
        /// Only sessions starting at or after this date/time
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Only sessions starting at or before this date/time
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
    },
    /// Check a CSV file without importing it
    Validate {
        /// CSV file to check
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import sessions from a CSV file
    Import {
        /// CSV file to import
        path: PathBuf,
        /// How imported sessions combine with stored ones
        #[arg(long, value_enum, default_value_t = ImportModeArg::SkipDuplicates)]
        mode: ImportModeArg,
        /// Import the valid rows even when other rows have errors
        #[arg(long)]
        skip_invalid: bool,
    },
    /// Delete every stored session
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Configure the CLI
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl From<ExportFormat> for pomo_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => Self::Csv,
            ExportFormat::Json => Self::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImportModeArg {
    /// Replace all stored sessions with the file's sessions
    ReplaceAll,
    /// Add sessions, dropping those that duplicate a stored one
    SkipDuplicates,
    /// Add every session, duplicates included
    KeepDuplicates,
}

impl From<ImportModeArg> for ImportMode {
    fn from(mode: ImportModeArg) -> Self {
        match mode {
            ImportModeArg::ReplaceAll => Self::ReplaceAll,
            ImportModeArg::SkipDuplicates => Self::AddSkipDuplicates,
            ImportModeArg::KeepDuplicates => Self::AddKeepDuplicates,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the CLI config file
    Init {
        /// Default database path
        #[arg(long, value_name = "PATH")]
        db_path: Option<PathBuf>,
        /// Storage budget in bytes
        #[arg(long, value_name = "BYTES")]
        capacity_bytes: Option<usize>,
        /// Default export format
        #[arg(long, value_enum)]
        export_format: Option<ExportFormat>,
    },
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
