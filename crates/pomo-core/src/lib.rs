//! pomo-core - Core library for Pomo
//!
//! This crate contains the session model, validation rules, the versioned
//! storage codec, CSV import and export, and the statistics shared by all Pomo
//! interfaces.

pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod stats;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{Session, Severity, ValidationIssue};
pub use store::SessionStore;
