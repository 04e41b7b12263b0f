//! Shared utilities for CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use wt_core::{Analysis, AnalysisConfig, analyze_raw};

use crate::Config;
use crate::cli::InputArgs;
use crate::ingest;

/// An analysis together with the parameters that produced it.
#[derive(Debug)]
pub struct AnalysisRun {
    pub analysis: Analysis,
    pub config: AnalysisConfig,
    pub files: Vec<PathBuf>,
}

/// Resolves inputs, loads logs and runs the analysis.
///
/// Configuration is validated before any file is read.
pub fn run_analysis(input: &InputArgs, config: &Config) -> Result<AnalysisRun> {
    let config = config.clone().with_overrides(input);
    let analysis_config = config.analysis().context("invalid configuration")?;

    let files = if input.files.is_empty() {
        ingest::discover_log_files(&config.logs_dir)?
    } else {
        input.files.clone()
    };

    let raw = ingest::load_logs(&files)?;
    let analysis = analyze_raw(raw, &analysis_config).context("failed to analyze logs")?;

    tracing::info!(
        chunks = analysis.chunks.len(),
        developers = analysis.summaries.len(),
        removed = analysis.removed_owner_count,
        "identified work chunks"
    );

    Ok(AnalysisRun {
        analysis,
        config: analysis_config,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("Date/Time (UTC)\tUser\n{body}")).unwrap();
        path
    }

    #[test]
    fn test_run_analysis_scans_logs_dir() {
        let temp = tempfile::tempdir().unwrap();
        write_log(
            temp.path(),
            "a.txt",
            "2025-01-15 09:00:00\talice\n2025-01-15 09:20:00\talice\n",
        );
        write_log(temp.path(), "b.csv", "2025-01-15 11:00:00\tbob\n");

        let input = InputArgs {
            logs_dir: Some(temp.path().to_path_buf()),
            ..InputArgs::default()
        };
        let run = run_analysis(&input, &Config::default()).unwrap();

        assert_eq!(run.files.len(), 2);
        assert_eq!(run.analysis.chunks.len(), 2);
        assert_eq!(run.analysis.summaries[0].owner.as_str(), "alice");
    }

    #[test]
    fn test_run_analysis_rejects_config_before_reading() {
        let input = InputArgs {
            files: vec![PathBuf::from("/nonexistent/log.txt")],
            inactivity: Some(0),
            ..InputArgs::default()
        };

        let err = run_analysis(&input, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_run_analysis_fails_on_malformed_timestamp() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_log(temp.path(), "a.txt", "not-a-date\talice\n");

        let input = InputArgs {
            files: vec![path],
            ..InputArgs::default()
        };
        let err = run_analysis(&input, &Config::default()).unwrap_err();

        let chain = format!("{err:#}");
        assert!(chain.contains("a.txt:2"), "unexpected error: {chain}");
    }
}
