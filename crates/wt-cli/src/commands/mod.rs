//! CLI subcommand implementations.

pub mod export;
pub mod report;
pub mod util;
pub mod xlsx;
