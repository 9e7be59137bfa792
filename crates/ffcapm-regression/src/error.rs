//! Error types for regression estimation.

use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting a linear model
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Fewer observations than parameters plus one
    #[error("Insufficient observations: need at least {required}, got {actual}")]
    InsufficientObservations {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Regressors are linearly dependent
    #[error("Design matrix is rank deficient: rank {rank} < {columns} columns")]
    RankDeficient {
        /// Numerical rank
        rank: usize,
        /// Number of columns including the intercept
        columns: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Input contains NaN or infinity
    #[error("Non-finite value in {0}")]
    NonFiniteInput(&'static str),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reference distribution could not be built
    #[error("Distribution error: {0}")]
    Distribution(String),
}
