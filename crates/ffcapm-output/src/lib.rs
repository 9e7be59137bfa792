#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffcapm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod summary;

pub use export::{
    ExportError, ExportFormat, Exporter, FactorSeriesRow, PortfolioExport, PortfolioHolding,
    StockRegressionRow, StockRegressionTable,
};
pub use report::{Section, SectionedReport, TIMESTAMP_FORMAT, now, timestamped_path};
pub use summary::{CoefficientRow, RegressionSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
