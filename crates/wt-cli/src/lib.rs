//! Work time CLI library.
//!
//! This crate provides the CLI interface: log ingestion, configuration and
//! report rendering around `wt-core`.

mod cli;
pub mod commands;
mod config;
pub mod ingest;

pub use cli::{Cli, Commands, ExportArgs, InputArgs, ReportArgs};
pub use config::Config;
