//! Error taxonomy for the analysis core.

use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::event::DataError;
pub use crate::types::ValidationError;

/// Any failure an analysis run can report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
