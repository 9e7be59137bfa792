//! Instruments and weekly level tables.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

/// Listing exchange of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    /// Shanghai Stock Exchange
    #[serde(rename = "SH")]
    Shanghai,

    /// Shenzhen Stock Exchange
    #[serde(rename = "SZ")]
    Shenzhen,
}

impl Exchange {
    /// Both exchanges, Shanghai first.
    pub const ALL: [Self; 2] = [Self::Shanghai, Self::Shenzhen];

    /// Two-letter exchange suffix.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Shanghai => "SH",
            Self::Shenzhen => "SZ",
        }
    }

    /// Parse the exchange from a ticker such as `600048.SH` or `000002.SZ`.
    ///
    /// The explicit suffix wins; otherwise the first digit of a six-digit
    /// A-share code decides (`6`/`9` Shanghai, `0`/`2`/`3` Shenzhen).
    pub fn from_ticker(ticker: &str) -> Option<Self> {
        let upper = ticker.trim().to_ascii_uppercase();
        let stem = upper.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
        if let Some((_, suffix)) = stem.rsplit_once('.') {
            match suffix {
                "SH" | "SS" => return Some(Self::Shanghai),
                "SZ" => return Some(Self::Shenzhen),
                _ => {}
            }
        }
        let code = stem.split('.').next().unwrap_or(stem);
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match code.as_bytes()[0] {
            b'6' | b'9' => Some(Self::Shanghai),
            b'0' | b'2' | b'3' => Some(Self::Shenzhen),
            _ => None,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A listed stock of the study universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Column header identifying the stock.
    pub name: String,
    /// Listing exchange, fixed at load time.
    pub exchange: Exchange,
}

impl Instrument {
    /// Create an instrument.
    pub fn new(name: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            name: name.into(),
            exchange,
        }
    }
}

/// Weekly closing levels of a set of instruments.
///
/// Rows are strictly increasing week-ending dates; every cell is a finite,
/// strictly positive level. The table is immutable once built.
#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<Instrument>,
    frame: DataFrame,
}

impl PriceTable {
    /// Build a table from per-instrument level columns.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate instruments, length mismatch against
    /// `dates`, unordered dates, or a non-positive or non-finite level.
    pub fn new(
        name: &str,
        dates: Vec<NaiveDate>,
        columns: Vec<(Instrument, Vec<f64>)>,
    ) -> Result<Self> {
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(DataError::UnorderedDates {
                sheet: name.to_string(),
                date: w[1].to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut instruments = Vec::with_capacity(columns.len());
        let mut series = Vec::with_capacity(columns.len());
        for (instrument, levels) in columns {
            if !seen.insert(instrument.name.clone()) {
                return Err(DataError::DuplicateColumn {
                    sheet: name.to_string(),
                    column: instrument.name,
                });
            }
            if levels.len() != dates.len() {
                return Err(DataError::Misaligned {
                    left: name.to_string(),
                    right: instrument.name,
                    reason: format!("{} levels for {} dates", levels.len(), dates.len()),
                });
            }
            ensure_positive(&instrument.name, &dates, &levels)?;
            series.push(Column::new(instrument.name.as_str().into(), levels));
            instruments.push(instrument);
        }

        let frame = DataFrame::new(series)?;
        Ok(Self {
            dates,
            instruments,
            frame,
        })
    }

    /// Week-ending dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of weeks.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Instruments in column order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Look up an instrument by name.
    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.name == name)
    }

    /// Underlying polars frame (one Float64 column per instrument).
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Level series of one instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the instrument is not in the table.
    pub fn levels(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.frame.column(name)?;
        Ok(column
            .as_materialized_series()
            .f64()?
            .into_no_null_iter()
            .collect())
    }
}

/// Check that a level series is finite and strictly positive.
pub(crate) fn ensure_positive(column: &str, dates: &[NaiveDate], levels: &[f64]) -> Result<()> {
    match levels
        .iter()
        .zip(dates)
        .find(|(v, _)| !v.is_finite() || **v <= 0.0)
    {
        Some((value, date)) => Err(DataError::NonPositiveLevel {
            column: column.to_string(),
            date: date.to_string(),
            value: *value,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn weeks(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2016, 1, 8).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::weeks(i as i64))
            .collect()
    }

    #[rstest]
    #[case("600048.SH", Some(Exchange::Shanghai))]
    #[case("000002.SZ", Some(Exchange::Shenzhen))]
    #[case("600048", Some(Exchange::Shanghai))]
    #[case("300001", Some(Exchange::Shenzhen))]
    #[case("保利地产(600048.SH)", Some(Exchange::Shanghai))]
    #[case("000002.sz", Some(Exchange::Shenzhen))]
    #[case("ABC", None)]
    fn test_exchange_from_ticker(#[case] ticker: &str, #[case] expected: Option<Exchange>) {
        assert_eq!(Exchange::from_ticker(ticker), expected);
    }

    #[test]
    fn test_price_table_roundtrip_levels() {
        let table = PriceTable::new(
            "prices",
            weeks(3),
            vec![
                (Instrument::new("A", Exchange::Shanghai), vec![1.0, 2.0, 3.0]),
                (Instrument::new("B", Exchange::Shenzhen), vec![4.0, 5.0, 6.0]),
            ],
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.levels("B").unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(table.instrument("A").unwrap().exchange, Exchange::Shanghai);
    }

    #[test]
    fn test_price_table_rejects_duplicates() {
        let err = PriceTable::new(
            "prices",
            weeks(2),
            vec![
                (Instrument::new("A", Exchange::Shanghai), vec![1.0, 2.0]),
                (Instrument::new("A", Exchange::Shanghai), vec![1.0, 2.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_price_table_rejects_non_positive() {
        let err = PriceTable::new(
            "prices",
            weeks(2),
            vec![(Instrument::new("A", Exchange::Shanghai), vec![1.0, 0.0])],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::NonPositiveLevel { .. }));
    }

    #[test]
    fn test_price_table_rejects_short_column() {
        let err = PriceTable::new(
            "prices",
            weeks(3),
            vec![(Instrument::new("A", Exchange::Shanghai), vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::Misaligned { .. }));
    }
}
