//! Excel workbook export for `wt export --excel`.
//!
//! The workbook holds a summary, day and week pivots, long-form breakdowns,
//! every chunk, one sheet per developer and an `Info` sheet. Sheets are first
//! built as plain rows so their content can be checked without reading xlsx.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook, Worksheet};
use wt_core::event::LOG_TIMESTAMP_FORMAT;
use wt_core::{Period, PeriodPivot, WorkChunk, breakdown, pivot, round_hours, totals};

use super::report::round_minutes;
use super::util::AnalysisRun;

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

const SUMMARY: &str = "Summary";
const INFO: &str = "Info";
const TOTAL: &str = "TOTAL";

/// One cell of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Hours or minutes, already rounded for display.
    Number(f64),
    Count(u64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A sheet with a header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: impl Into<String>, header: &[&str]) -> Self {
        Self {
            name: name.into(),
            header: header.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }
}

fn hours(value: f64) -> Cell {
    Cell::Number(round_hours(value))
}

fn date(value: NaiveDate) -> Cell {
    Cell::Text(value.format("%Y-%m-%d").to_string())
}

fn time(value: DateTime<Utc>) -> Cell {
    Cell::Text(value.format(LOG_TIMESTAMP_FORMAT).to_string())
}

/// Sheet name for a developer: the part before `@`, cleaned up for Excel.
pub fn sheet_name(owner: &str) -> String {
    let local = owner.split('@').next().unwrap_or(owner);
    let cleaned: String = local
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    if cleaned.is_empty() {
        "developer".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Makes `name` unique among `used`, comparing case-insensitively as Excel does.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let base: String = name
                .chars()
                .take(MAX_SHEET_NAME - suffix.chars().count())
                .collect();
            format!("{base}{suffix}")
        })
        .find(|candidate| used.insert(candidate.to_lowercase()))
        .unwrap_or(name)
}

fn chunk_row(chunk: &WorkChunk, with_owner: bool) -> Vec<Cell> {
    let mut row = Vec::with_capacity(7);
    if with_owner {
        row.push(chunk.owner.as_str().into());
    }
    row.extend([
        time(chunk.start),
        time(chunk.end),
        Cell::Number(round_minutes(chunk.duration_seconds)),
        hours(chunk.hours()),
        Cell::Count(chunk.event_count),
        chunk
            .gap_to_next_seconds
            .map_or(Cell::Empty, |gap| Cell::Number(round_minutes(gap))),
    ]);
    row
}

const CHUNK_COLUMNS: [&str; 6] = [
    "Start",
    "End",
    "Duration (min)",
    "Duration (hours)",
    "Log Count",
    "Gap to Next (min)",
];

fn pivot_sheet(name: &str, label: &str, table: &PeriodPivot<NaiveDate>) -> Sheet {
    let owners = table.owners();
    let mut header = vec![label];
    header.extend(owners.iter().map(|owner| owner.as_str()));
    header.push(TOTAL);
    let mut sheet = Sheet::new(name, &header);

    for period in table.periods() {
        let mut row = vec![date(*period)];
        row.extend(owners.iter().map(|owner| hours(table.hours(period, owner))));
        row.push(hours(table.period_total(period)));
        sheet.rows.push(row);
    }

    let owner_totals = table.owner_totals();
    let mut total_row = vec![Cell::from(TOTAL)];
    total_row.extend(
        owners
            .iter()
            .map(|owner| hours(owner_totals.get(owner).copied().unwrap_or(0.0))),
    );
    total_row.push(hours(table.grand_total()));
    sheet.rows.push(total_row);
    sheet
}

fn breakdown_sheet(name: &str, label: &str, chunks: &[WorkChunk], period: Period) -> Sheet {
    let mut sheet = Sheet::new(
        name,
        &[label, "Developer", "Duration (hours)", "Log Count", "Chunk Count"],
    );
    sheet.rows = breakdown(chunks, |ts| period.bucket(ts))
        .into_iter()
        .map(|row| {
            vec![
                date(row.period),
                row.owner.as_str().into(),
                hours(row.hours),
                Cell::Count(row.event_count),
                Cell::Count(row.chunk_count),
            ]
        })
        .collect();
    sheet
}

/// Lays out every sheet of the workbook, in order.
pub fn build_sheets(run: &AnalysisRun, generated_at: DateTime<Utc>) -> Vec<Sheet> {
    let analysis = &run.analysis;
    let chunks = &analysis.chunks;
    let mut sheets = Vec::new();

    let mut summary = Sheet::new(
        SUMMARY,
        &["Developer", "Duration (hours)", "Log Count", "Chunk Count"],
    );
    summary.rows = analysis
        .summaries
        .iter()
        .map(|s| {
            vec![
                s.owner.as_str().into(),
                hours(s.total_hours),
                Cell::Count(s.total_events),
                Cell::Count(s.chunk_count),
            ]
        })
        .collect();
    sheets.push(summary);

    sheets.push(pivot_sheet(
        "Pivot - Hours by Day",
        "Date",
        &pivot(chunks, |ts| Period::Day.bucket(ts)),
    ));
    sheets.push(pivot_sheet(
        "Pivot - Hours by Week",
        "Week Start",
        &pivot(chunks, |ts| Period::Week.bucket(ts)),
    ));
    sheets.push(breakdown_sheet("Work by Day", "Date", chunks, Period::Day));
    sheets.push(breakdown_sheet(
        "Work by Week",
        "Week Start",
        chunks,
        Period::Week,
    ));

    let mut all = Sheet::new("All Chunks", &["Developer"]);
    all.header.extend(CHUNK_COLUMNS.iter().map(ToString::to_string));
    all.rows = chunks.iter().map(|chunk| chunk_row(chunk, true)).collect();
    sheets.push(all);

    let mut used: HashSet<String> = sheets.iter().map(|s| s.name.to_lowercase()).collect();
    used.insert(INFO.to_lowercase());
    // Reserved by Excel.
    used.insert("history".to_string());
    for owner_chunks in chunks.chunk_by(|a, b| a.owner == b.owner) {
        let name = unique_name(sheet_name(owner_chunks[0].owner.as_str()), &mut used);
        let mut sheet = Sheet::new(name, &CHUNK_COLUMNS);
        sheet.rows = owner_chunks
            .iter()
            .map(|chunk| chunk_row(chunk, false))
            .collect();
        sheets.push(sheet);
    }

    let overall = totals(chunks);
    let mut info = Sheet::new(INFO, &["Metric", "Value"]);
    info.rows = vec![
        vec!["Total Developers".into(), Cell::Count(overall.developer_count as u64)],
        vec!["Total Chunks".into(), Cell::Count(overall.chunk_count as u64)],
        vec!["Total Logs".into(), Cell::Count(overall.event_count)],
        vec!["Total Hours".into(), hours(overall.total_hours)],
        vec![
            "Inactivity Period (min)".into(),
            Cell::Count(u64::try_from(run.config.inactivity.minutes()).unwrap_or_default()),
        ],
        vec!["Minimum Hours".into(), hours(run.config.min_hours)],
        vec![
            "Developers Filtered Out".into(),
            Cell::Count(analysis.removed_owner_count as u64),
        ],
        vec![
            "Generated At (UTC)".into(),
            Cell::Text(generated_at.format(LOG_TIMESTAMP_FORMAT).to_string()),
        ],
    ];
    sheets.push(info);

    sheets
}

#[allow(clippy::cast_precision_loss)]
fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    header: &Format,
    number: &Format,
) -> Result<()> {
    worksheet.set_name(&sheet.name)?;

    let mut widths: Vec<usize> = sheet.header.iter().map(|h| h.chars().count()).collect();
    for (col, title) in sheet.header.iter().enumerate() {
        worksheet.write_string_with_format(0, u16::try_from(col)?, title, header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (idx, cells) in sheet.rows.iter().enumerate() {
        let row = u32::try_from(idx + 1)?;
        for (col, cell) in cells.iter().enumerate() {
            let column = u16::try_from(col)?;
            let width = match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row, column, text)?;
                    text.chars().count()
                }
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, column, *value, number)?;
                    format!("{value:.2}").len()
                }
                Cell::Count(value) => {
                    worksheet.write_number(row, column, *value as f64)?;
                    value.to_string().len()
                }
                Cell::Empty => 0,
            };
            if let Some(current) = widths.get_mut(col) {
                *current = (*current).max(width);
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(u16::try_from(col)?, *width as f64 + 2.0)?;
    }
    Ok(())
}

/// Writes `sheets` to an `.xlsx` file at `path`.
pub fn write_workbook(sheets: &[Sheet], path: &Path) -> Result<()> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0xFF_FFFF))
        .set_background_color(Color::RGB(0x2F_75B5))
        .set_pattern(FormatPattern::Solid)
        .set_border(FormatBorder::Thin);
    let number = Format::new().set_num_format("0.00");

    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet, &header, &number)
            .with_context(|| format!("failed to write sheet {:?}", sheet.name))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    tracing::info!(path = %path.display(), sheets = sheets.len(), "wrote Excel workbook");
    Ok(())
}
