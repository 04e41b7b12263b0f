//! Validated analysis parameters.

use chrono::Duration;
use thiserror::Error;

/// Default idle gap, in minutes, that separates two work chunks.
pub const DEFAULT_INACTIVITY_MINUTES: i64 = 30;

/// Rejected configuration values. Raised before any processing starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("inactivity threshold must be positive, got {minutes} minutes")]
    NonPositiveThreshold { minutes: i64 },

    #[error("inactivity threshold of {minutes} minutes is too large")]
    ThresholdOutOfRange { minutes: i64 },

    #[error("minimum hours must be a non-negative number, got {value}")]
    InvalidMinHours { value: f64 },
}

/// Maximum allowed gap between consecutive events of one chunk.
///
/// Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InactivityThreshold(Duration);

impl InactivityThreshold {
    pub fn new(threshold: Duration) -> Result<Self, ConfigError> {
        if threshold <= Duration::zero() {
            return Err(ConfigError::NonPositiveThreshold {
                minutes: threshold.num_minutes(),
            });
        }
        Ok(Self(threshold))
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, ConfigError> {
        let threshold =
            Duration::try_minutes(minutes).ok_or(ConfigError::ThresholdOutOfRange { minutes })?;
        Self::new(threshold)
    }

    pub const fn duration(self) -> Duration {
        self.0
    }

    pub fn minutes(self) -> i64 {
        self.0.num_minutes()
    }
}

impl Default for InactivityThreshold {
    fn default() -> Self {
        Self(Duration::minutes(DEFAULT_INACTIVITY_MINUTES))
    }
}

/// Parameters for a full analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub inactivity: InactivityThreshold,

    /// Developers whose total is below this many hours are dropped.
    /// `0.0` disables filtering.
    pub min_hours: f64,
}

impl AnalysisConfig {
    pub fn new(inactivity_minutes: i64, min_hours: f64) -> Result<Self, ConfigError> {
        let inactivity = InactivityThreshold::from_minutes(inactivity_minutes)?;
        if !min_hours.is_finite() || min_hours < 0.0 {
            return Err(ConfigError::InvalidMinHours { value: min_hours });
        }
        Ok(Self {
            inactivity,
            min_hours,
        })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inactivity: InactivityThreshold::default(),
            min_hours: 0.0,
        }
    }
}
