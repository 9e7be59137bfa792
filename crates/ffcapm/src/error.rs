//! Error type of the study pipelines.

use ffcapm_data::DataError;
use ffcapm_factors::FactorError;
use ffcapm_output::ExportError;
use ffcapm_regression::RegressionError;
use thiserror::Error;

/// Result type for the study pipelines.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure between loading the inputs and writing the results.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input data
    #[error(transparent)]
    Data(#[from] DataError),

    /// Return, grouping or factor construction failed
    #[error(transparent)]
    Factor(#[from] FactorError),

    /// A regression could not be fitted
    #[error("{context}: {source}")]
    Regression {
        /// Which regression failed
        context: String,
        /// Underlying estimator error
        #[source]
        source: RegressionError,
    },

    /// Results could not be rendered or written
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Configuration is inconsistent with the loaded data
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Attach the name of the regression that failed.
    pub fn regression(context: impl Into<String>, source: RegressionError) -> Self {
        Self::Regression {
            context: context.into(),
            source,
        }
    }
}

impl From<RegressionError> for Error {
    fn from(source: RegressionError) -> Self {
        Self::regression("regression", source)
    }
}
