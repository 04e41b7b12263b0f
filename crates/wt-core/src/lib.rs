//! Core domain logic for developer work time analysis.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: validating raw activity records
//! - Segmentation: splitting each developer's timeline into work chunks
//! - Aggregation: per-developer summaries and per-period pivots
//! - Filtering: dropping developers below a minimum number of hours

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
mod pipeline;
pub mod segment;
pub mod types;

pub use aggregate::{
    DeveloperSummary, Period, PeriodBreakdown, PeriodPivot, Totals, breakdown, pivot,
    round_hours, summarize, totals,
};
pub use config::{AnalysisConfig, ConfigError, DEFAULT_INACTIVITY_MINUTES, InactivityThreshold};
pub use error::{Error, Result};
pub use event::{DataError, Event, RawEvent, parse_timestamp, prepare_events};
pub use filter::{FilterOutcome, filter_by_minimum_hours};
pub use pipeline::{Analysis, analyze, analyze_raw};
pub use segment::{WorkChunk, segment, segment_owner};
pub use types::{OwnerId, ValidationError};
