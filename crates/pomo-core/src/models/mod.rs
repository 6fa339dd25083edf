//! Data models for Pomo

mod session;
mod validation;

pub use session::{generate_session_id, Session};
pub use validation::{
    has_blocking_errors, validate_candidate, validate_session, Severity, ValidationIssue,
};
