//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid arguments, out-of-domain lookups, grids or units that cannot be reconciled,
//! and degenerate interpolation donor sets.
//!
//! Integration stopping at a boundary is not an error; it is reported through
//! [`crate::flow::Outcome`] on the returned trajectory.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("incompatible grids: {0}")]
    IncompatibleGrids(String),

    #[error("incompatible units '{left}' and '{right}'")]
    IncompatibleUnits { left: String, right: String },

    #[error("degenerate interpolation: {0}")]
    DegenerateInterpolation(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn incompatible_units(left: impl ToString, right: impl ToString) -> Self {
        Error::IncompatibleUnits {
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
