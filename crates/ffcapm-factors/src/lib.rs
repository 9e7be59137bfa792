#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffcapm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod calendar;
pub mod error;
pub mod grouping;
pub mod market;
pub mod portfolio;
pub mod registry;
pub mod returns;
pub mod risk_free;
pub mod smb_hml;

pub use calendar::{SampleCalendar, SampleYear};
pub use error::{FactorError, Result};
pub use grouping::{
    Bucket, BucketAssignment, GroupScheme, SizeCohort, ValueLevel, YearGrouping, assign_buckets,
    percentile_index,
};
pub use market::{ExchangeWeights, IndexReturns};
pub use portfolio::{PortfolioWeights, Weighting, excess_returns, weighted_returns};
pub use registry::{
    FactorCategory, FactorInfo, FactorModel, available_factors, factors_by_category, factors_for,
    get_factor_info, regressor_names,
};
pub use returns::{ReturnKind, ReturnTable, derive_returns};
pub use risk_free::{RiskFreeAlignment, WEEKS_PER_YEAR, weekly_risk_free};
pub use smb_hml::FactorSeries;

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
