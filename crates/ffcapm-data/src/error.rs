//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading and validating the study panel.
///
/// Every variant describes malformed input: loading fails fast and no
/// partially loaded table is ever returned.
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook could not be opened or read
    #[error("Workbook error in {path}: {reason}")]
    Workbook {
        /// Path of the workbook
        path: String,
        /// Underlying reader message
        reason: String,
    },

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Unsupported file extension
    #[error("Unsupported input file {0}: expected .xlsx, .xls or .csv")]
    UnsupportedFormat(String),

    /// Requested sheet is absent from the workbook
    #[error("Sheet '{sheet}' not found in {path}")]
    SheetNotFound {
        /// Path of the workbook
        path: String,
        /// Requested sheet name
        sheet: String,
    },

    /// Sheet has no header row or no data rows
    #[error("Sheet '{0}' is empty")]
    EmptySheet(String),

    /// Column referenced by name or position does not exist
    #[error("Column {column} not found in sheet '{sheet}'")]
    ColumnNotFound {
        /// Sheet name
        sheet: String,
        /// Column reference as written in the configuration
        column: String,
    },

    /// Two columns share the same header
    #[error("Duplicate column '{column}' in sheet '{sheet}'")]
    DuplicateColumn {
        /// Sheet name
        sheet: String,
        /// Duplicated header
        column: String,
    },

    /// Two rows share the same index label
    #[error("Duplicate row '{row}' in sheet '{sheet}'")]
    DuplicateRow {
        /// Sheet name
        sheet: String,
        /// Duplicated index label
        row: String,
    },

    /// Date cell could not be parsed
    #[error("Unparseable date '{value}' in sheet '{sheet}'")]
    UnparseableDate {
        /// Sheet name
        sheet: String,
        /// Raw cell text
        value: String,
    },

    /// Dates are not strictly increasing
    #[error("Dates in sheet '{sheet}' are not strictly increasing at {date}")]
    UnorderedDates {
        /// Sheet name
        sheet: String,
        /// First out-of-order date
        date: String,
    },

    /// Numeric cell is empty or not a number
    #[error("Missing value in sheet '{sheet}' at row '{row}', column '{column}'")]
    MissingValue {
        /// Sheet name
        sheet: String,
        /// Row label
        row: String,
        /// Column header
        column: String,
    },

    /// Price or index level is not strictly positive
    #[error("Non-positive level {value} for '{column}' at {date}")]
    NonPositiveLevel {
        /// Column header
        column: String,
        /// Observation date
        date: String,
        /// Offending value
        value: f64,
    },

    /// Two sheets that must share a date index do not
    #[error("Sheets '{left}' and '{right}' are not aligned: {reason}")]
    Misaligned {
        /// First sheet
        left: String,
        /// Second sheet
        right: String,
        /// What differs
        reason: String,
    },

    /// Exchange could not be determined for an instrument
    #[error("Cannot determine exchange for instrument '{0}'")]
    UnknownExchange(String),

    /// Instrument absent from a snapshot table
    #[error("Instrument '{instrument}' not found in snapshot '{snapshot}'")]
    UnknownInstrument {
        /// Snapshot name
        snapshot: String,
        /// Instrument name
        instrument: String,
    },

    /// Date absent from a snapshot table
    #[error("Date {date} not found in snapshot '{snapshot}'")]
    UnknownDate {
        /// Snapshot name
        snapshot: String,
        /// Requested date
        date: String,
    },
}

impl DataError {
    pub(crate) fn workbook(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Workbook {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
