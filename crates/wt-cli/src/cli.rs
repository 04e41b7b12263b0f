//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Developer work time analysis.
///
/// Groups activity logs into work chunks separated by idle gaps and reports
/// hours per developer, per day and per week.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a work time report.
    Report(ReportArgs),

    /// Write chunks, summary and pivots as CSV files or an Excel workbook.
    Export(ExportArgs),
}

/// Where events come from and how they are segmented.
#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Log files to analyze (tab-separated). Defaults to every .txt/.csv file in the logs directory.
    pub files: Vec<PathBuf>,

    /// Directory searched for log files when none are given.
    #[arg(long)]
    pub logs_dir: Option<PathBuf>,

    /// Minutes of inactivity that start a new work chunk.
    #[arg(short, long)]
    pub inactivity: Option<i64>,

    /// Drop developers with fewer total hours than this.
    #[arg(long)]
    pub min_hours: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Only show the per-developer summary.
    #[arg(long)]
    pub summary: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).multiple(true).args(["output", "excel"])))]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output path prefix; files are written as `<BASE>_chunks.csv`, `<BASE>_summary.csv`, ...
    #[arg(short, long, value_name = "BASE")]
    pub output: Option<PathBuf>,

    /// Write a multi-sheet Excel workbook to this file.
    #[arg(long, value_name = "FILE")]
    pub excel: Option<PathBuf>,
}
