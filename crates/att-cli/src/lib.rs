//! Attendance tracker CLI library.
//!
//! This crate provides the CLI interface for the attendance engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{BulkAction, BulkArgs, Cli, Commands, PolicyAction, ProxyAction, RecordArgs};
pub use config::Config;
