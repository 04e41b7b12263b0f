//! Minimum-hours filtering of developers.

use std::collections::{BTreeSet, HashMap};

use crate::aggregate::{DeveloperSummary, summarize};
use crate::segment::WorkChunk;
use crate::types::OwnerId;

/// Chunks that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub chunks: Vec<WorkChunk>,
    /// Distinct owners whose chunks were all removed.
    pub removed_owner_count: usize,
}

/// Drops every chunk of owners whose total is below `min_hours`.
///
/// Totals come from `summaries` when provided; owners they do not cover (or
/// all owners, when `summaries` is `None`) are re-derived from `chunks`.
/// A `min_hours` of zero or less keeps everything.
pub fn filter_by_minimum_hours(
    chunks: Vec<WorkChunk>,
    summaries: Option<&[DeveloperSummary]>,
    min_hours: f64,
) -> FilterOutcome {
    if min_hours.is_nan() || min_hours <= 0.0 {
        return FilterOutcome {
            chunks,
            removed_owner_count: 0,
        };
    }

    let mut totals: HashMap<OwnerId, f64> = summaries
        .unwrap_or_default()
        .iter()
        .map(|summary| (summary.owner.clone(), summary.total_hours))
        .collect();

    let uncovered: Vec<WorkChunk> = chunks
        .iter()
        .filter(|chunk| !totals.contains_key(&chunk.owner))
        .cloned()
        .collect();
    totals.extend(
        summarize(&uncovered)
            .into_iter()
            .map(|summary| (summary.owner, summary.total_hours)),
    );

    let (kept, dropped): (Vec<WorkChunk>, Vec<WorkChunk>) = chunks
        .into_iter()
        .partition(|chunk| totals.get(&chunk.owner).is_some_and(|&h| h >= min_hours));

    let removed: BTreeSet<&OwnerId> = dropped.iter().map(|chunk| &chunk.owner).collect();
    let removed_owner_count = removed.len();

    if removed_owner_count > 0 {
        tracing::info!(
            removed = removed_owner_count,
            min_hours,
            "filtered out developers below minimum hours"
        );
    }

    FilterOutcome {
        chunks: kept,
        removed_owner_count,
    }
}
