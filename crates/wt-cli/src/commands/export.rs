//! Implementation of the `wt export` command.
//!
//! Writes the analysis as a set of CSV files sharing a common prefix:
//! chunks, per-developer summary, day and week pivots (with `TOTAL` row and
//! column) and long-form day and week breakdowns. `--excel` writes the same
//! tables, plus one sheet per developer, as a workbook.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use wt_core::event::LOG_TIMESTAMP_FORMAT;
use wt_core::{DeveloperSummary, Period, PeriodPivot, WorkChunk, breakdown, pivot};

use super::report::{format_hours, round_minutes};
use super::util::{AnalysisRun, run_analysis};
use super::xlsx;
use crate::{Config, ExportArgs};

/// Label of the total row and column in pivot files.
const TOTAL: &str = "TOTAL";

fn minutes(seconds: f64) -> String {
    format!("{:.2}", round_minutes(seconds))
}

pub fn write_chunks_csv<W: Write>(writer: W, chunks: &[WorkChunk]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Developer",
        "Start",
        "End",
        "Duration (min)",
        "Duration (hours)",
        "Log Count",
        "Gap to Next (min)",
    ])?;
    for chunk in chunks {
        wtr.write_record([
            chunk.owner.to_string(),
            chunk.start.format(LOG_TIMESTAMP_FORMAT).to_string(),
            chunk.end.format(LOG_TIMESTAMP_FORMAT).to_string(),
            minutes(chunk.duration_seconds),
            format_hours(chunk.hours()),
            chunk.event_count.to_string(),
            chunk
                .gap_to_next_seconds
                .map(minutes)
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summary_csv<W: Write>(writer: W, summaries: &[DeveloperSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Developer", "Duration (hours)", "Log Count", "Chunk Count"])?;
    for summary in summaries {
        wtr.write_record([
            summary.owner.to_string(),
            format_hours(summary.total_hours),
            summary.total_events.to_string(),
            summary.chunk_count.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a pivot with periods as rows and developers as columns.
pub fn write_pivot_csv<W: Write>(
    writer: W,
    period_label: &str,
    pivot: &PeriodPivot<NaiveDate>,
) -> Result<()> {
    let owners = pivot.owners();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![period_label.to_string()];
    header.extend(owners.iter().map(ToString::to_string));
    header.push(TOTAL.to_string());
    wtr.write_record(&header)?;

    for period in pivot.periods() {
        let mut row = vec![period.format("%Y-%m-%d").to_string()];
        row.extend(owners.iter().map(|owner| format_hours(pivot.hours(period, owner))));
        row.push(format_hours(pivot.period_total(period)));
        wtr.write_record(&row)?;
    }

    let owner_totals = pivot.owner_totals();
    let mut total_row = vec![TOTAL.to_string()];
    total_row.extend(
        owners
            .iter()
            .map(|owner| format_hours(owner_totals.get(owner).copied().unwrap_or(0.0))),
    );
    total_row.push(format_hours(pivot.grand_total()));
    wtr.write_record(&total_row)?;

    wtr.flush()?;
    Ok(())
}

pub fn write_breakdown_csv<W: Write>(
    writer: W,
    period_label: &str,
    chunks: &[WorkChunk],
    period: Period,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        period_label,
        "Developer",
        "Duration (hours)",
        "Log Count",
        "Chunk Count",
    ])?;
    for row in breakdown(chunks, |ts| period.bucket(ts)) {
        wtr.write_record([
            row.period.format("%Y-%m-%d").to_string(),
            row.owner.to_string(),
            format_hours(row.hours),
            row.event_count.to_string(),
            row.chunk_count.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Appends `suffix` to the file name of `base`.
fn output_path(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    base.with_file_name(name)
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Writes every CSV file for `run` and returns their paths.
pub fn write_all(base: &Path, run: &AnalysisRun) -> Result<Vec<PathBuf>> {
    let analysis = &run.analysis;
    let mut written = Vec::new();

    let path = output_path(base, "_chunks.csv");
    write_chunks_csv(create(&path)?, &analysis.chunks)
        .with_context(|| format!("failed to write {}", path.display()))?;
    written.push(path);

    let path = output_path(base, "_summary.csv");
    write_summary_csv(create(&path)?, &analysis.summaries)
        .with_context(|| format!("failed to write {}", path.display()))?;
    written.push(path);

    for (period, label, name) in [
        (Period::Day, "Date", "day"),
        (Period::Week, "Week Start", "week"),
    ] {
        let path = output_path(base, &format!("_by_{name}.csv"));
        let table = pivot(&analysis.chunks, |ts| period.bucket(ts));
        write_pivot_csv(create(&path)?, label, &table)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);

        let path = output_path(base, &format!("_work_by_{name}.csv"));
        write_breakdown_csv(create(&path)?, label, &analysis.chunks, period)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

/// Run the export command.
pub fn run(args: &ExportArgs, config: &Config) -> Result<()> {
    let run = run_analysis(&args.input, config)?;

    let mut written = Vec::new();
    if let Some(base) = &args.output {
        written.extend(write_all(base, &run)?);
    }
    if let Some(path) = &args.excel {
        xlsx::write_workbook(&xlsx::build_sheets(&run, Utc::now()), path)?;
        written.push(path.clone());
    }

    for path in &written {
        println!("{}", path.display());
    }
    tracing::info!(files = written.len(), "export complete");

    Ok(())
}
