//! End-to-end analysis: segment, summarize, filter.

use crate::aggregate::{DeveloperSummary, summarize};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::event::{Event, RawEvent, prepare_events};
use crate::filter::filter_by_minimum_hours;
use crate::segment::{WorkChunk, segment};

/// Result of an analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Chunks of the developers that passed the filter.
    pub chunks: Vec<WorkChunk>,
    /// Summaries over `chunks`, recomputed after filtering.
    pub summaries: Vec<DeveloperSummary>,
    pub removed_owner_count: usize,
}

/// Runs segmentation, summary and minimum-hours filtering over `events`.
pub fn analyze(events: &[Event], config: &AnalysisConfig) -> Analysis {
    let chunks = segment(events, config.inactivity);
    let summaries = summarize(&chunks);

    if config.min_hours <= 0.0 {
        return Analysis {
            chunks,
            summaries,
            removed_owner_count: 0,
        };
    }

    let outcome = filter_by_minimum_hours(chunks, Some(summaries.as_slice()), config.min_hours);
    Analysis {
        summaries: summarize(&outcome.chunks),
        chunks: outcome.chunks,
        removed_owner_count: outcome.removed_owner_count,
    }
}

/// Validates raw log records and analyzes them.
///
/// Fails without producing partial results if any record is malformed.
pub fn analyze_raw<I>(raw: I, config: &AnalysisConfig) -> Result<Analysis>
where
    I: IntoIterator<Item = RawEvent>,
{
    let events = prepare_events(raw)?;
    Ok(analyze(&events, config))
}
