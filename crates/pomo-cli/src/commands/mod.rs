pub mod add;
pub mod clear;
pub mod common;
pub mod config;
pub mod export;
pub mod import;
pub mod info;
pub mod list;
pub mod stats;
