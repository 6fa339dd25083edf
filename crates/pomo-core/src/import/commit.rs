//! Merge strategies applied when an import preview is committed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::duplicates::is_duplicate;
use crate::models::{generate_session_id, Session};

/// How imported candidates combine with the sessions already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportMode {
    /// Candidates replace everything stored
    ReplaceAll,
    /// Candidates that duplicate a stored session are dropped
    AddSkipDuplicates,
    /// Every candidate is appended; colliding ids are re-issued
    AddKeepDuplicates,
}

/// Result of a merge, before it is saved
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub sessions: Vec<Session>,
    pub added: usize,
    pub skipped_duplicates: usize,
    pub reassigned_ids: usize,
}

/// Combine `candidates` with `existing` according to `mode`.
pub fn merge_import(
    candidates: Vec<Session>,
    existing: Vec<Session>,
    mode: ImportMode,
) -> MergeOutcome {
    match mode {
        ImportMode::ReplaceAll => MergeOutcome {
            added: candidates.len(),
            sessions: candidates,
            skipped_duplicates: 0,
            reassigned_ids: 0,
        },
        ImportMode::AddSkipDuplicates => {
            let total = candidates.len();
            let fresh = candidates
                .into_iter()
                .filter(|candidate| {
                    !existing
                        .iter()
                        .any(|current| is_duplicate(candidate, current))
                })
                .collect::<Vec<_>>();
            let skipped_duplicates = total - fresh.len();
            let (sessions, reassigned_ids, added) = append_with_unique_ids(existing, fresh);
            MergeOutcome {
                sessions,
                added,
                skipped_duplicates,
                reassigned_ids,
            }
        }
        ImportMode::AddKeepDuplicates => {
            let (sessions, reassigned_ids, added) = append_with_unique_ids(existing, candidates);
            MergeOutcome {
                sessions,
                added,
                skipped_duplicates: 0,
                reassigned_ids,
            }
        }
    }
}

// Duplicate content is allowed; duplicate identity is not.
fn append_with_unique_ids(
    mut existing: Vec<Session>,
    incoming: Vec<Session>,
) -> (Vec<Session>, usize, usize) {
    let mut used = existing
        .iter()
        .map(|session| session.id.clone())
        .collect::<HashSet<_>>();
    let mut reassigned = 0;
    let added = incoming.len();

    for mut session in incoming {
        if used.contains(&session.id) {
            session.id = generate_session_id();
            reassigned += 1;
        }
        used.insert(session.id.clone());
        existing.push(session);
    }

    (existing, reassigned, added)
}
