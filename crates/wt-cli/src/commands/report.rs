//! Report command for printing work time reports.
//!
//! This module implements `wt report` with human-readable and JSON output.
//! Hours are rounded here, once, right before display.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use wt_core::event::LOG_TIMESTAMP_FORMAT;
use wt_core::{Period, PeriodPivot, WorkChunk, pivot, round_hours, totals};

use super::util::{AnalysisRun, run_analysis};
use crate::{Config, ReportArgs};

const DEVELOPER_WIDTH: usize = 40;

// ========== Formatting Helpers ==========

/// Formats hours with two decimals.
pub fn format_hours(hours: f64) -> String {
    format!("{:.2}", round_hours(hours))
}

/// Converts seconds to minutes rounded to two decimals.
pub fn round_minutes(seconds: f64) -> f64 {
    (seconds / 60.0 * 100.0).round() / 100.0
}

/// Formats a gap in whole minutes, `-` when there is no next chunk.
pub fn format_gap(gap_seconds: Option<f64>) -> String {
    gap_seconds.map_or_else(|| "-".to_string(), |s| format!("{:.0}min", s / 60.0))
}

fn heading<W: Write>(writer: &mut W, title: &str) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "─".repeat(title.chars().count()))
}

// ========== Text Report ==========

/// Writes the human-readable report.
///
/// With `summary_only`, per-chunk details are left out.
pub fn write_report<W: Write>(
    writer: &mut W,
    run: &AnalysisRun,
    summary_only: bool,
) -> io::Result<()> {
    let analysis = &run.analysis;

    writeln!(writer, "WORK TIME REPORT")?;
    writeln!(
        writer,
        "Inactivity threshold: {} min",
        run.config.inactivity.minutes()
    )?;
    if run.config.min_hours > 0.0 {
        writeln!(
            writer,
            "Minimum hours: {}h ({} developer(s) filtered out)",
            format_hours(run.config.min_hours),
            analysis.removed_owner_count
        )?;
    }

    let overall = totals(&analysis.chunks);
    heading(writer, "OVERALL")?;
    writeln!(writer, "Developers:   {}", overall.developer_count)?;
    writeln!(writer, "Work chunks:  {}", overall.chunk_count)?;
    writeln!(writer, "Hours worked: {}h", format_hours(overall.total_hours))?;

    if analysis.summaries.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "No activity found.")?;
        return Ok(());
    }

    heading(writer, "BY DEVELOPER")?;
    writeln!(
        writer,
        "{:<DEVELOPER_WIDTH$} {:>9} {:>8} {:>8}",
        "Developer", "Hours", "Chunks", "Logs"
    )?;
    for summary in &analysis.summaries {
        writeln!(
            writer,
            "{:<DEVELOPER_WIDTH$} {:>9} {:>8} {:>8}",
            summary.owner.as_str(),
            format!("{}h", format_hours(summary.total_hours)),
            summary.chunk_count,
            summary.total_events
        )?;
    }

    if summary_only {
        return Ok(());
    }

    // Chunks are grouped by owner in ascending order.
    for chunks in analysis.chunks.chunk_by(|a, b| a.owner == b.owner) {
        write_owner_chunks(writer, chunks[0].owner.as_str(), chunks)?;
    }

    Ok(())
}

fn write_owner_chunks<W: Write>(
    writer: &mut W,
    owner: &str,
    chunks: &[WorkChunk],
) -> io::Result<()> {
    heading(writer, &format!("CHUNKS: {owner}"))?;
    writeln!(
        writer,
        "{:<4} {:<19}  {:<19}  {:>9} {:>6} {:>8}",
        "#", "Start", "End", "Duration", "Logs", "Gap"
    )?;

    for (idx, chunk) in chunks.iter().enumerate() {
        writeln!(
            writer,
            "{:<4} {:<19}  {:<19}  {:>9} {:>6} {:>8}",
            idx + 1,
            chunk.start.format(LOG_TIMESTAMP_FORMAT).to_string(),
            chunk.end.format(LOG_TIMESTAMP_FORMAT).to_string(),
            format!("{}h", format_hours(chunk.hours())),
            chunk.event_count,
            format_gap(chunk.gap_to_next_seconds)
        )?;
    }

    let hours: f64 = chunks.iter().map(WorkChunk::hours).sum();
    writeln!(
        writer,
        "Total: {}h in {} chunks",
        format_hours(hours),
        chunks.len()
    )
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub inactivity_minutes: i64,
    pub min_hours: f64,
    pub removed_developers: usize,
    pub totals: JsonTotals,
    pub developers: Vec<JsonDeveloper>,
    pub by_day: JsonPivot,
    pub by_week: JsonPivot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<JsonChunk>,
}

#[derive(Debug, Serialize)]
pub struct JsonTotals {
    pub developers: usize,
    pub chunks: usize,
    pub events: u64,
    pub hours: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonDeveloper {
    pub developer: String,
    pub hours: f64,
    pub chunks: u64,
    pub events: u64,
}

#[derive(Debug, Serialize)]
pub struct JsonPivot {
    pub rows: Vec<JsonPivotRow>,
    /// Hours per developer across all periods.
    pub totals: BTreeMap<String, f64>,
    pub grand_total: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonPivotRow {
    pub period: String,
    /// Hours per developer; developers without activity in the period are 0.
    pub hours: BTreeMap<String, f64>,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonChunk {
    pub developer: String,
    pub start: String,
    pub end: String,
    pub hours: f64,
    pub events: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_minutes: Option<f64>,
}

/// Converts a pivot to rounded, string-keyed rows.
pub fn json_pivot(pivot: &PeriodPivot<NaiveDate>) -> JsonPivot {
    let owners = pivot.owners();
    let rows = pivot
        .periods()
        .map(|period| JsonPivotRow {
            period: period.format("%Y-%m-%d").to_string(),
            hours: owners
                .iter()
                .map(|&owner| (owner.to_string(), round_hours(pivot.hours(period, owner))))
                .collect(),
            total: round_hours(pivot.period_total(period)),
        })
        .collect();

    JsonPivot {
        rows,
        totals: pivot
            .owner_totals()
            .into_iter()
            .map(|(owner, hours)| (owner.to_string(), round_hours(hours)))
            .collect(),
        grand_total: round_hours(pivot.grand_total()),
    }
}

/// Formats the analysis as JSON.
pub fn format_report_json(
    run: &AnalysisRun,
    generated_at: DateTime<Utc>,
    summary_only: bool,
) -> Result<String> {
    let analysis = &run.analysis;
    let overall = totals(&analysis.chunks);

    let chunks = if summary_only {
        Vec::new()
    } else {
        analysis
            .chunks
            .iter()
            .map(|chunk| JsonChunk {
                developer: chunk.owner.to_string(),
                start: chunk.start.to_rfc3339(),
                end: chunk.end.to_rfc3339(),
                hours: round_hours(chunk.hours()),
                events: chunk.event_count,
                gap_minutes: chunk.gap_to_next_seconds.map(round_minutes),
            })
            .collect()
    };

    let report = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        inactivity_minutes: run.config.inactivity.minutes(),
        min_hours: run.config.min_hours,
        removed_developers: analysis.removed_owner_count,
        totals: JsonTotals {
            developers: overall.developer_count,
            chunks: overall.chunk_count,
            events: overall.event_count,
            hours: round_hours(overall.total_hours),
        },
        developers: analysis
            .summaries
            .iter()
            .map(|summary| JsonDeveloper {
                developer: summary.owner.to_string(),
                hours: round_hours(summary.total_hours),
                chunks: summary.chunk_count,
                events: summary.total_events,
            })
            .collect(),
        by_day: json_pivot(&pivot(&analysis.chunks, |ts| Period::Day.bucket(ts))),
        by_week: json_pivot(&pivot(&analysis.chunks, |ts| Period::Week.bucket(ts))),
        chunks,
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run(args: &ReportArgs, config: &Config) -> Result<()> {
    let run = run_analysis(&args.input, config)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.json {
        let output = format_report_json(&run, Utc::now(), args.summary)?;
        writeln!(writer, "{output}").context("failed to write report")?;
    } else {
        write_report(&mut writer, &run, args.summary).context("failed to write report")?;
    }
    writer.flush().context("failed to write report")?;

    if let Some(path) = &args.output {
        tracing::info!(path = %path.display(), "report saved");
    }

    Ok(())
}
