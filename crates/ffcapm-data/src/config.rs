//! Workbook layout configuration.
//!
//! The study reads a handful of time-indexed sheets whose exact names and
//! column positions vary between data vendors. Nothing about the layout is
//! hard-coded in the loaders: each sheet is described by a [`SheetSource`],
//! each series by a [`ColumnRef`] and each instrument block by an
//! [`InstrumentSelection`]. The `Default` impls describe the workbooks the
//! study was first run against.

use crate::{error::Result, panel::Exchange};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, fs, ops::Range, path::Path, path::PathBuf};

/// Location of one sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SheetSource {
    /// Workbook (`.xlsx`/`.xls`) or `.csv` file.
    pub path: PathBuf,
    /// Sheet name inside a workbook; the first sheet when absent. Ignored for CSV.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Position of the row-label column (dates or instrument names).
    #[serde(default)]
    pub index_column: usize,
}

impl SheetSource {
    /// Create a source for a named sheet with the index in the first column.
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: Some(sheet.into()),
            index_column: 0,
        }
    }

    /// Create a source for a CSV file with the index in the first column.
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
            index_column: 0,
        }
    }

    /// Human-readable label used in errors and logs.
    pub fn label(&self) -> String {
        self.sheet.as_ref().map_or_else(
            || self.path.display().to_string(),
            |sheet| format!("{}#{}", self.path.display(), sheet),
        )
    }

    /// Resolve a relative path against `base`.
    pub fn rebase(&mut self, base: &Path) {
        if self.path.is_relative() {
            self.path = base.join(&self.path);
        }
    }
}

/// Reference to a data column, by header or by position.
///
/// Positions count data columns only (the index column is excluded).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColumnRef {
    /// Zero-based position among the data columns.
    Position(usize),
    /// Exact header text.
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "#{p}"),
            Self::Name(n) => write!(f, "'{n}'"),
        }
    }
}

/// Half-open range of data-column positions. An absent end means "to the last column".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRange {
    /// First position (inclusive).
    #[serde(default)]
    pub start: usize,
    /// Last position (exclusive).
    #[serde(default)]
    pub end: Option<usize>,
}

impl ColumnRange {
    /// Range `start..end`.
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Every column from `start` on.
    pub const fn from(start: usize) -> Self {
        Self { start, end: None }
    }

    /// Clamp against the number of available columns, `None` when out of bounds.
    pub fn resolve(&self, width: usize) -> Option<Range<usize>> {
        let end = self.end.unwrap_or(width);
        (self.start <= end && end <= width).then_some(self.start..end)
    }
}

/// A block of instrument columns sharing one exchange assignment rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstrumentSelection {
    /// Columns holding instrument levels.
    #[serde(default)]
    pub columns: ColumnRange,
    /// Exchange for every column of the block; parsed from the ticker when absent.
    #[serde(default)]
    pub exchange: Option<Exchange>,
}

/// Layout of the CAPM workbook: one sheet holding the deposit rate, both
/// exchange indices and every stock's closing price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CapmLayout {
    /// Sheet with all weekly series.
    pub sheet: SheetSource,
    /// Annualised three-month deposit rate.
    pub risk_free: ColumnRef,
    /// Shanghai composite index level.
    pub shanghai_index: ColumnRef,
    /// Shenzhen component index level.
    pub shenzhen_index: ColumnRef,
    /// Stock price blocks.
    pub instruments: Vec<InstrumentSelection>,
    /// Optional market-cap snapshot used to value-weight the sector portfolio.
    pub market_cap: Option<SheetSource>,
}

impl Default for CapmLayout {
    fn default() -> Self {
        Self {
            sheet: SheetSource::new("data_CAPM.xlsx", "new"),
            risk_free: ColumnRef::Position(0),
            shanghai_index: ColumnRef::Position(1),
            shenzhen_index: ColumnRef::Position(2),
            instruments: vec![
                InstrumentSelection {
                    columns: ColumnRange::new(3, 63),
                    exchange: Some(Exchange::Shenzhen),
                },
                InstrumentSelection {
                    columns: ColumnRange::new(63, 136),
                    exchange: Some(Exchange::Shanghai),
                },
            ],
            market_cap: None,
        }
    }
}

/// Layout of the FF3 workbook: an index sheet, a close-price sheet and two
/// year-end snapshot sheets (instruments in rows, dates in columns).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Ff3Layout {
    /// Sheet with the deposit rate and both exchange indices.
    pub indices: SheetSource,
    /// Annualised three-month deposit rate.
    pub risk_free: ColumnRef,
    /// Shanghai composite index level.
    pub shanghai_index: ColumnRef,
    /// Shenzhen component index level.
    pub shenzhen_index: ColumnRef,
    /// Close prices, same dates as `indices`.
    pub prices: SheetSource,
    /// Stock price blocks in `prices`.
    pub instruments: Vec<InstrumentSelection>,
    /// Total market value snapshots.
    pub market_cap: SheetSource,
    /// Book-to-market (inverse price-to-book) snapshots.
    pub book_to_market: SheetSource,
}

impl Default for Ff3Layout {
    fn default() -> Self {
        let workbook = "data_FF3.xlsx";
        Self {
            indices: SheetSource::new(workbook, "股指"),
            risk_free: ColumnRef::Name("定期存款3M".to_string()),
            shanghai_index: ColumnRef::Name("上证综指000001.SH".to_string()),
            shenzhen_index: ColumnRef::Name("深证成指399001.SZ".to_string()),
            prices: SheetSource::new(workbook, "收盘价"),
            instruments: vec![InstrumentSelection::default()],
            market_cap: SheetSource::new(workbook, "总市值"),
            book_to_market: SheetSource::new(workbook, "市净率倒数"),
        }
    }
}

/// Read a JSON configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not deserialize into `T`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_untagged() {
        let refs: Vec<ColumnRef> = serde_json::from_str(r#"[2, "定期存款3M"]"#).unwrap();
        assert_eq!(refs[0], ColumnRef::Position(2));
        assert_eq!(refs[1], ColumnRef::Name("定期存款3M".to_string()));
    }

    #[test]
    fn test_column_range_resolve() {
        assert_eq!(ColumnRange::new(3, 63).resolve(136), Some(3..63));
        assert_eq!(ColumnRange::from(2).resolve(5), Some(2..5));
        assert_eq!(ColumnRange::new(3, 10).resolve(5), None);
    }

    #[test]
    fn test_capm_layout_default_blocks() {
        let layout = CapmLayout::default();
        assert_eq!(layout.instruments.len(), 2);
        assert_eq!(layout.instruments[0].exchange, Some(Exchange::Shenzhen));
        assert_eq!(layout.instruments[1].columns, ColumnRange::new(63, 136));
    }

    #[test]
    fn test_partial_layout_uses_defaults() {
        let layout: Ff3Layout =
            serde_json::from_str(r#"{"prices": {"path": "prices.csv"}}"#).unwrap();
        assert_eq!(layout.prices, SheetSource::csv("prices.csv"));
        assert_eq!(layout.market_cap, Ff3Layout::default().market_cap);
    }

    #[test]
    fn test_rebase_relative_only() {
        let mut rel = SheetSource::csv("a.csv");
        rel.rebase(Path::new("/data"));
        assert_eq!(rel.path, PathBuf::from("/data/a.csv"));

        let mut abs = SheetSource::csv("/tmp/b.csv");
        abs.rebase(Path::new("/data"));
        assert_eq!(abs.path, PathBuf::from("/tmp/b.csv"));
    }
}
