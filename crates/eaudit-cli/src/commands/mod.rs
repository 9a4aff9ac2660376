//! CLI command handlers
//!
//! Each subcommand has its own module.

pub mod config;
pub mod delete;
pub mod scan;
