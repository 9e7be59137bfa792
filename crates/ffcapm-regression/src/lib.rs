#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffcapm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod linalg;
pub mod ols;

// Re-export main types
pub use error::{RegressionError, Result};
pub use linalg::HouseholderQr;
pub use ols::{
    LinearEstimator, OlsConfig, OlsResults, OrdinaryLeastSquares, add_constant, design_matrix,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
