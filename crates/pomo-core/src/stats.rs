//! Rollup counts and per-subject summaries derived from the session list.

use std::collections::HashMap;

use chrono::{DateTime, Days, Local, Utc};
use serde::Serialize;

use crate::models::Session;
use crate::util::start_of_local_day;

/// Number of subjects kept in [`DataStatistics::subjects`]
pub const TOP_SUBJECTS: usize = 10;

/// Completed-session counts for the current day, week and month windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rollups {
    pub daily: usize,
    pub weekly: usize,
    pub monthly: usize,
}

/// Aggregate figures over the whole session list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStatistics {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Minutes summed over completed sessions
    pub total_minutes: f64,
    pub earliest_session: Option<DateTime<Utc>>,
    pub latest_session: Option<DateTime<Utc>>,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: String,
    pub count: usize,
    pub total_time: f64,
}

/// Count completed sessions started today, within the last 7 days and within
/// the last 30 days.
///
/// Windows are anchored at local midnight and end at `now`; the lower bound
/// is inclusive.
pub fn compute_rollups(sessions: &[Session], now: DateTime<Local>) -> Rollups {
    let today = start_of_local_day(&now);
    let week_start = today.checked_sub_days(Days::new(7)).unwrap_or(today);
    let month_start = today.checked_sub_days(Days::new(30)).unwrap_or(today);
    let now = now.with_timezone(&Utc);
    let (today, week_start, month_start) = (
        today.with_timezone(&Utc),
        week_start.with_timezone(&Utc),
        month_start.with_timezone(&Utc),
    );

    sessions
        .iter()
        .filter(|session| session.completed && session.start_time <= now)
        .fold(Rollups::default(), |mut rollups, session| {
            let started = session.start_time;
            if started >= today {
                rollups.daily += 1;
            }
            if started >= week_start {
                rollups.weekly += 1;
            }
            if started >= month_start {
                rollups.monthly += 1;
            }
            rollups
        })
}

/// Totals, time span and the top subjects by accumulated minutes.
///
/// The subject breakdown covers every session, completed or not. Subjects
/// with equal totals keep first-seen order.
pub fn compute_statistics(sessions: &[Session]) -> DataStatistics {
    let mut stats = DataStatistics {
        total_sessions: sessions.len(),
        ..DataStatistics::default()
    };

    let mut subjects: Vec<SubjectSummary> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for session in sessions {
        if session.completed {
            stats.completed_sessions += 1;
            stats.total_minutes += session.duration;
        }

        stats.earliest_session = Some(
            stats
                .earliest_session
                .map_or(session.start_time, |earliest| earliest.min(session.start_time)),
        );
        stats.latest_session = Some(
            stats
                .latest_session
                .map_or(session.start_time, |latest| latest.max(session.start_time)),
        );

        let subject = session.subject.trim();
        let position = *positions.entry(subject.to_string()).or_insert_with(|| {
            subjects.push(SubjectSummary {
                subject: subject.to_string(),
                count: 0,
                total_time: 0.0,
            });
            subjects.len() - 1
        });
        subjects[position].count += 1;
        subjects[position].total_time += session.duration;
    }

    // Stable sort keeps first-seen order for ties.
    subjects.sort_by(|a, b| b.total_time.total_cmp(&a.total_time));
    subjects.truncate(TOP_SUBJECTS);
    stats.subjects = subjects;
    stats
}
