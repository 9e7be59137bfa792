#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffcapm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod capm;
pub mod config;
pub mod error;
pub mod ff3;
pub mod universe;

// Re-export main types from sub-crates
pub use ffcapm_data as data;
pub use ffcapm_factors as factors;
pub use ffcapm_output as output;
pub use ffcapm_regression as regression;

pub use capm::{CapmConfig, CapmOutputs, CapmResults, CapmStudy};
pub use config::{CapmSection, Ff3Section, OutputConfig, StudyConfig};
pub use error::{Error, Result};
pub use ff3::{BucketSeries, Ff3Config, Ff3Outputs, Ff3Results, Ff3Study, SchemeSeries};
pub use universe::{MarketScope, ScopedUniverse, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
