//! Session segmentation.
//!
//! Splits each owner's activity timeline into work chunks: maximal runs of
//! events where no two consecutive events are further apart than the
//! inactivity threshold.
//!
//! # Algorithm Summary
//!
//! 1. Partition events by owner
//! 2. Sort each owner's timestamps ascending
//! 3. Fold over the timeline with a single open chunk, closing it whenever the
//!    gap to the next event is strictly greater than the threshold
//!
//! Owners are independent, so partitions are segmented in parallel.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::InactivityThreshold;
use crate::event::Event;
use crate::types::OwnerId;

/// A contiguous burst of activity for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkChunk {
    pub owner: OwnerId,
    /// Timestamp of the first absorbed event.
    pub start: DateTime<Utc>,
    /// Timestamp of the last absorbed event.
    pub end: DateTime<Utc>,
    /// `end - start`, never negative.
    pub duration_seconds: f64,
    /// Number of events absorbed, at least 1.
    pub event_count: u64,
    /// Idle time until this owner's next chunk. `None` for the owner's last chunk.
    pub gap_to_next_seconds: Option<f64>,
}

impl WorkChunk {
    /// Duration in hours, unrounded.
    pub fn hours(&self) -> f64 {
        self.duration_seconds / 3600.0
    }
}

/// Running state for the chunk currently being built.
#[derive(Debug, Clone, Copy)]
struct OpenChunk {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    event_count: u64,
}

impl OpenChunk {
    const fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
            event_count: 1,
        }
    }

    const fn extend(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            start: self.start,
            end: timestamp,
            event_count: self.event_count + 1,
        }
    }

    fn close(self, owner: &OwnerId, gap_to_next: Option<Duration>) -> WorkChunk {
        WorkChunk {
            owner: owner.clone(),
            start: self.start,
            end: self.end,
            duration_seconds: seconds(self.end - self.start),
            event_count: self.event_count,
            gap_to_next_seconds: gap_to_next.map(seconds),
        }
    }
}

/// Exact length of `delta` in nanoseconds.
pub(crate) fn nanoseconds(delta: Duration) -> i128 {
    delta.num_nanoseconds().map_or_else(
        || i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos()),
        i128::from,
    )
}

#[allow(clippy::cast_precision_loss)]
fn seconds(delta: Duration) -> f64 {
    nanoseconds(delta) as f64 / 1e9
}

/// Segments a single owner's timeline.
///
/// `timestamps` may be in any order. Equal timestamps are interchangeable, so
/// tie order does not affect the result.
pub fn segment_owner(
    owner: &OwnerId,
    mut timestamps: Vec<DateTime<Utc>>,
    threshold: InactivityThreshold,
) -> Vec<WorkChunk> {
    timestamps.sort_unstable();

    let Some((&first, rest)) = timestamps.split_first() else {
        return Vec::new();
    };

    let threshold = threshold.duration();
    let (mut chunks, open) = rest.iter().fold(
        (Vec::new(), OpenChunk::at(first)),
        |(mut chunks, open), &timestamp| {
            let gap = timestamp - open.end;
            // Strict: a gap exactly equal to the threshold stays in the chunk.
            if gap > threshold {
                chunks.push(open.close(owner, Some(gap)));
                (chunks, OpenChunk::at(timestamp))
            } else {
                (chunks, open.extend(timestamp))
            }
        },
    );
    chunks.push(open.close(owner, None));
    chunks
}

/// Groups event timestamps by owner, ordered by owner.
fn partition_by_owner(events: &[Event]) -> Vec<(&OwnerId, Vec<DateTime<Utc>>)> {
    let mut timelines: BTreeMap<&OwnerId, Vec<DateTime<Utc>>> = BTreeMap::new();
    for event in events {
        timelines
            .entry(&event.owner)
            .or_default()
            .push(event.timestamp);
    }
    timelines.into_iter().collect()
}

/// Segments events of any number of owners into work chunks.
///
/// Output is ordered by owner, then chronologically within each owner.
pub fn segment(events: &[Event], threshold: InactivityThreshold) -> Vec<WorkChunk> {
    let timelines = partition_by_owner(events);
    let owner_count = timelines.len();

    let chunks: Vec<WorkChunk> = timelines
        .into_par_iter()
        .flat_map_iter(|(owner, timestamps)| segment_owner(owner, timestamps, threshold))
        .collect();

    tracing::debug!(
        events = events.len(),
        owners = owner_count,
        chunks = chunks.len(),
        threshold_minutes = threshold.minutes(),
        "segmented events into work chunks"
    );

    chunks
}
