//! Error types for return, portfolio and factor construction.

use crate::{calendar::SampleYear, grouping::Bucket};
use ffcapm_data::DataError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while deriving returns, grouping or building factors.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Underlying data lookup failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Series too short to derive a return
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// A derived return is NaN or infinite
    #[error("Non-finite return for '{series}' at week {week}")]
    NonFiniteReturn {
        /// Series name
        series: String,
        /// Zero-based week index in the return series
        week: usize,
    },

    /// A snapshot value used for sorting or weighting is NaN or infinite
    #[error("Non-finite {snapshot} value for '{instrument}'")]
    NonFiniteSnapshot {
        /// Snapshot name
        snapshot: String,
        /// Instrument name
        instrument: String,
    },

    /// A portfolio member is absent from the return table
    #[error("Instrument '{0}' is a portfolio member but has no return series")]
    MissingInstrument(String),

    /// A requested week lies outside the return table
    #[error("Week range {start}..{end} exceeds the {len} available weeks")]
    WeekOutOfRange {
        /// Range start
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Weeks available
        len: usize,
    },

    /// Portfolio has no members
    #[error("Portfolio '{0}' has no members")]
    EmptyPortfolio(String),

    /// Weights cannot be normalised
    #[error("Portfolio '{portfolio}' has non-positive total weight {total}")]
    NonPositiveWeight {
        /// Portfolio name
        portfolio: String,
        /// Sum of raw weights
        total: f64,
    },

    /// Two series that must align do not
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which series
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A sample year has no weeks in the return table
    #[error("No weeks of {0} in the return series")]
    EmptyYear(SampleYear),

    /// A bucket required by the scheme is missing
    #[error("Bucket {0} missing from the bucket returns")]
    MissingBucket(Bucket),
}
