//! CLI command implementations

pub mod config;
pub mod create;
pub mod list;
pub mod log;
pub mod restore;
pub mod show;
