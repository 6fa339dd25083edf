//! Subject + start-time proximity heuristic for spotting re-imported sessions.

use serde::Serialize;

use crate::models::Session;

/// Start times closer than this are considered the same real event
pub const DUPLICATE_WINDOW_SECONDS: i64 = 60;

/// An incoming candidate paired with the existing session it appears to repeat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    pub candidate: Session,
    pub existing: Session,
}

/// Same subject (ignoring case and surrounding whitespace) and start times
/// less than a minute apart.
///
/// Two genuinely distinct sessions logged within a minute on the same subject
/// are indistinguishable from a duplicate under this rule.
pub fn is_duplicate(a: &Session, b: &Session) -> bool {
    let gap = (a.start_time - b.start_time).num_milliseconds().abs();
    a.subject_key() == b.subject_key() && gap < DUPLICATE_WINDOW_SECONDS * 1000
}

/// Pair each candidate with the first existing session it duplicates.
pub fn find_duplicates(candidates: &[Session], existing: &[Session]) -> Vec<DuplicateMatch> {
    candidates
        .iter()
        .filter_map(|candidate| {
            existing
                .iter()
                .find(|current| is_duplicate(candidate, current))
                .map(|current| DuplicateMatch {
                    candidate: candidate.clone(),
                    existing: current.clone(),
                })
        })
        .collect()
}
