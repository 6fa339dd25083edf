use std::path::Path;

use chrono::Local;
use pomo_core::stats::{DataStatistics, Rollups};
use serde::Serialize;

use crate::commands::common::{format_minutes, open_store, subject_preview};
use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub rollups: Rollups,
    pub statistics: DataStatistics,
}

pub fn run_stats(as_json: bool, db_path: &Path, config: &CliConfig) -> Result<(), CliError> {
    let store = open_store(db_path, config)?;
    let report = StatsReport {
        rollups: store.rollups(Local::now())?,
        statistics: store.statistics()?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_stats_lines(&report) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn format_stats_lines(report: &StatsReport) -> Vec<String> {
    let StatsReport {
        rollups,
        statistics,
    } = report;

    let mut lines = vec![
        format!(
            "Today: {}  This week: {}  This month: {}",
            rollups.daily, rollups.weekly, rollups.monthly
        ),
        format!(
            "Sessions: {} ({} completed), {} focused",
            statistics.total_sessions,
            statistics.completed_sessions,
            format_minutes(statistics.total_minutes)
        ),
    ];

    if let (Some(earliest), Some(latest)) = (statistics.earliest_session, statistics.latest_session)
    {
        lines.push(format!(
            "Range: {} to {}",
            earliest.with_timezone(&Local).format("%Y-%m-%d"),
            latest.with_timezone(&Local).format("%Y-%m-%d")
        ));
    }

    if !statistics.subjects.is_empty() {
        lines.push("Top subjects:".to_string());
        for summary in &statistics.subjects {
            lines.push(format!(
                "  {:<30}  {:>4} sessions  {:>8}",
                subject_preview(&summary.subject, 30),
                summary.count,
                format_minutes(summary.total_time)
            ));
        }
    }

    lines
}
