//! Reading activity logs into raw events.
//!
//! Logs are tab-separated exports with a header row. Only the owner and
//! timestamp columns are used; everything else is ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use glob::{Pattern, glob};
use wt_core::RawEvent;

/// Header of the column holding the developer identity.
pub const OWNER_COLUMN: &str = "User";

/// Header of the column holding the event time.
pub const TIMESTAMP_COLUMN: &str = "Date/Time (UTC)";

/// Extensions picked up when scanning a logs directory.
const LOG_EXTENSIONS: &[&str] = &["txt", "csv"];

/// Lists log files in `dir`, sorted by path.
pub fn discover_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        bail!("logs directory not found: {}", dir.display());
    }
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    let escaped = Pattern::escape(
        dir.to_str()
            .with_context(|| format!("logs directory is not valid UTF-8: {}", dir.display()))?,
    );

    let mut files = Vec::new();
    for extension in LOG_EXTENSIONS {
        let pattern = format!("{escaped}/*.{extension}");
        for entry in glob(&pattern).with_context(|| format!("invalid glob pattern {pattern}"))? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable log path"),
            }
        }
    }

    if files.is_empty() {
        bail!("no .txt or .csv files found in {}", dir.display());
    }

    files.sort();
    tracing::info!(count = files.len(), dir = %dir.display(), "found log files");
    Ok(files)
}

/// Parses tab-separated log records from `reader`.
///
/// `source` names the input in the resulting events and in error messages.
pub fn read_logs<R: Read>(reader: R, source: &str) -> Result<Vec<RawEvent>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header of {source}"))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .with_context(|| format!("{source}: missing required column {name:?}"))
    };
    let owner_idx = column(OWNER_COLUMN)?;
    let timestamp_idx = column(TIMESTAMP_COLUMN)?;

    let mut events = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        let record = record.with_context(|| format!("{source}: failed to read line {line}"))?;
        events.push(RawEvent {
            owner: record.get(owner_idx).map(str::to_string),
            timestamp: record
                .get(timestamp_idx)
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string),
            source: Some(source.to_string()),
            line,
        });
    }

    Ok(events)
}

/// Reads one log file. Events are tagged with the file name.
pub fn read_log_file(path: &Path) -> Result<Vec<RawEvent>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    let events = read_logs(BufReader::new(file), &source)?;
    tracing::info!(file = %path.display(), records = events.len(), "loaded log file");
    Ok(events)
}

/// Reads and concatenates several log files.
pub fn load_logs(paths: &[PathBuf]) -> Result<Vec<RawEvent>> {
    let mut events = Vec::new();
    for path in paths {
        events.extend(read_log_file(path)?);
    }
    if paths.len() > 1 {
        tracing::info!(
            files = paths.len(),
            records = events.len(),
            "combined log files"
        );
    }
    Ok(events)
}
