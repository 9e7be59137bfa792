#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffcapm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod panel;
pub mod sheet;
pub mod snapshot;

pub use config::{
    CapmLayout, ColumnRange, ColumnRef, Ff3Layout, InstrumentSelection, SheetSource, load_json,
};
pub use dataset::{CapmDataset, Ff3Dataset, MarketSeries};
pub use error::{DataError, Result};
pub use panel::{Exchange, Instrument, PriceTable};
pub use sheet::{Cell, RawSheet, parse_date};
pub use snapshot::SnapshotTable;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
