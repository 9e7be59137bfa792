//! Export functionality for ffcapm results.
//!
//! This module provides CSV and JSON export for per-stock CAPM tables,
//! bucket holdings and factor series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Whether this is one of the JSON formats.
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::PrettyJson)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Serialize a p-value with six decimals, the way the result tables print it.
fn six_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.6}"))
}

/// CAPM result of a single stock.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockRegressionRow {
    /// Instrument name.
    pub name: String,

    /// Slope on the market return.
    pub beta: f64,

    /// Coefficient of determination.
    pub rsquared: f64,

    /// Two-sided p-value of the slope.
    #[serde(serialize_with = "six_decimals")]
    pub pvalue: f64,
}

impl StockRegressionRow {
    /// Create a new row.
    pub const fn new(name: String, beta: f64, rsquared: f64, pvalue: f64) -> Self {
        Self {
            name,
            beta,
            rsquared,
            pvalue,
        }
    }
}

/// Per-stock CAPM results of one market scope.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockRegressionTable {
    /// Scope label (`sh_sz`, `sh`, `sz`).
    pub scope: String,

    /// One row per stock, in input column order.
    pub rows: Vec<StockRegressionRow>,
}

impl StockRegressionTable {
    /// Create a new table.
    pub const fn new(scope: String, rows: Vec<StockRegressionRow>) -> Self {
        Self { scope, rows }
    }

    /// Number of stocks.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Bucket or portfolio composition at formation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioExport {
    /// Portfolio name, e.g. `4_groups_SL`.
    pub name: String,

    /// Formation (snapshot) date.
    pub date: NaiveDate,

    /// Members with their weights.
    pub holdings: Vec<PortfolioHolding>,
}

impl PortfolioExport {
    /// Create a new portfolio export.
    pub const fn new(name: String, date: NaiveDate, holdings: Vec<PortfolioHolding>) -> Self {
        Self {
            name,
            date,
            holdings,
        }
    }

    /// Get total portfolio weight (should be close to 1.0).
    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight).sum()
    }
}

/// A single holding in a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioHolding {
    /// Instrument name.
    pub symbol: String,

    /// Weight in the portfolio (0.0 to 1.0).
    pub weight: f64,

    /// Market value at the formation date.
    pub market_value: Option<f64>,

    /// Book-to-market at the formation date.
    pub book_to_market: Option<f64>,
}

impl PortfolioHolding {
    /// Create a new portfolio holding.
    pub const fn new(
        symbol: String,
        weight: f64,
        market_value: Option<f64>,
        book_to_market: Option<f64>,
    ) -> Self {
        Self {
            symbol,
            weight,
            market_value,
            book_to_market,
        }
    }
}

/// One week of SMB and HML under one scheme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorSeriesRow {
    /// Return date.
    pub date: NaiveDate,

    /// Grouping scheme label.
    pub scheme: String,

    /// Small minus big.
    pub smb: f64,

    /// High minus low.
    pub hml: f64,
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

pub(crate) fn csv_to_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::PrettyJson => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    })
}

impl Exporter for StockRegressionTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                if self.rows.is_empty() {
                    wtr.write_record(["name", "beta", "rsquared", "pvalue"])?;
                }
                for row in &self.rows {
                    wtr.serialize(row)?;
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

impl Exporter for Vec<PortfolioExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record([
                    "portfolio",
                    "date",
                    "symbol",
                    "weight",
                    "market_value",
                    "book_to_market",
                ])?;
                for portfolio in self {
                    let date = portfolio.date.to_string();
                    for holding in &portfolio.holdings {
                        wtr.write_record([
                            &portfolio.name,
                            &date,
                            &holding.symbol,
                            &holding.weight.to_string(),
                            &holding
                                .market_value
                                .map(|v| v.to_string())
                                .unwrap_or_default(),
                            &holding
                                .book_to_market
                                .map(|v| v.to_string())
                                .unwrap_or_default(),
                        ])?;
                    }
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

impl Exporter for Vec<FactorSeriesRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for row in self {
                    wtr.serialize(row)?;
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table() -> StockRegressionTable {
        StockRegressionTable::new(
            "sh_sz".to_string(),
            vec![
                StockRegressionRow::new("000002.SZ".to_string(), 1.12, 0.41, 0.000_012_345_6),
                StockRegressionRow::new("600048.SH".to_string(), 0.87, 0.33, 0.25),
            ],
        )
    }

    #[test]
    fn test_stock_table_csv_formats_pvalue() {
        let csv = table().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("name,beta,rsquared,pvalue"));
        assert_eq!(lines.next(), Some("000002.SZ,1.12,0.41,0.000012"));
        assert_eq!(lines.next(), Some("600048.SH,0.87,0.33,0.250000"));
    }

    #[test]
    fn test_stock_table_json() {
        let json = table().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"scope\":\"sh_sz\""));
        assert!(json.contains("\"pvalue\":\"0.250000\""));
    }

    #[test]
    fn test_empty_stock_table_still_has_header() {
        let empty = StockRegressionTable::new("sz".to_string(), vec![]);
        assert!(empty.is_empty());
        let csv = empty.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv.trim(), "name,beta,rsquared,pvalue");
    }

    #[test]
    fn test_holdings_flat_csv() {
        let holdings = vec![PortfolioExport::new(
            "6_groups_BM".to_string(),
            NaiveDate::from_ymd_opt(2017, 12, 29).unwrap(),
            vec![PortfolioHolding::new("600383.SH".to_string(), 1.0, None, None)],
        )];
        let csv = holdings.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("portfolio,date,symbol,weight,market_value,book_to_market"));
        assert!(csv.contains("6_groups_BM,2017-12-29,600383.SH,1,,"));
        assert!(!csv.contains('#'));

        let json = holdings.export_to_string(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "6_groups_BM");
        assert_eq!(value[0]["holdings"][0]["symbol"], "600383.SH");
    }

    #[test]
    fn test_factor_series_csv() {
        let rows = vec![FactorSeriesRow {
            date: NaiveDate::from_ymd_opt(2016, 1, 8).unwrap(),
            scheme: "4_groups".to_string(),
            smb: 0.01,
            hml: -0.02,
        }];
        let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "date,scheme,smb,hml\n2016-01-08,4_groups,0.01,-0.02\n");
        let pretty = rows.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join(format!("ffcapm_export_{}.csv", std::process::id()));
        table().export_to_file(&path, ExportFormat::Csv).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("600048.SH"));
        std::fs::remove_file(path).ok();
    }
}
