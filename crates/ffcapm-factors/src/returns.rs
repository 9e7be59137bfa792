//! Return derivation.
//!
//! Turns weekly level series into weekly returns. The first period has no
//! prior reference and is dropped rather than imputed, so every return
//! series is exactly one element shorter than its level series.

use crate::error::{FactorError, Result};
use chrono::NaiveDate;
use ffcapm_data::{Instrument, PriceTable};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, ops::Range};

/// How a pair of consecutive levels becomes a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Gross ratio `p[t] / p[t-1]`.
    Ratio,
    /// Net simple return `p[t] / p[t-1] - 1`.
    Simple,
    /// Log return `ln(p[t] / p[t-1])`.
    Log,
}

impl ReturnKind {
    /// Return between two consecutive levels.
    pub fn between(self, previous: f64, current: f64) -> f64 {
        let ratio = current / previous;
        match self {
            Self::Ratio => ratio,
            Self::Simple => ratio - 1.0,
            Self::Log => ratio.ln(),
        }
    }

    fn expr(self, name: &str) -> Expr {
        let ratio = col(name) / col(name).shift(lit(1));
        let expr = match self {
            Self::Ratio => ratio,
            Self::Simple => ratio - lit(1.0),
            Self::Log => ratio.log(std::f64::consts::E),
        };
        expr.alias(name)
    }
}

/// Derive returns from one level series.
///
/// # Errors
///
/// Returns an error if fewer than two levels are given or a return is not finite.
pub fn derive_returns(name: &str, levels: &[f64], kind: ReturnKind) -> Result<Vec<f64>> {
    if levels.len() < 2 {
        return Err(FactorError::InsufficientData {
            required: 2,
            actual: levels.len(),
        });
    }
    levels
        .windows(2)
        .enumerate()
        .map(|(week, w)| {
            let r = kind.between(w[0], w[1]);
            if r.is_finite() {
                Ok(r)
            } else {
                Err(FactorError::NonFiniteReturn {
                    series: name.to_string(),
                    week,
                })
            }
        })
        .collect()
}

/// Weekly returns of every instrument of a price table.
///
/// Row `t` holds the return from week `t` to week `t + 1` of the source
/// table and is dated at week `t + 1`.
#[derive(Debug, Clone)]
pub struct ReturnTable {
    kind: ReturnKind,
    dates: Vec<NaiveDate>,
    instruments: Vec<Instrument>,
    columns: HashMap<String, usize>,
    values: Array2<f64>,
}

impl ReturnTable {
    /// Derive returns for every column of `prices`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has fewer than two weeks or any return is not finite.
    pub fn from_prices(prices: &PriceTable, kind: ReturnKind) -> Result<Self> {
        if prices.len() < 2 {
            return Err(FactorError::InsufficientData {
                required: 2,
                actual: prices.len(),
            });
        }

        let exprs: Vec<Expr> = prices
            .instruments()
            .iter()
            .map(|i| kind.expr(&i.name))
            .collect();
        let frame = prices
            .frame()
            .clone()
            .lazy()
            .select(exprs)
            .collect()?
            .slice(1, prices.len() - 1);

        let mut values = Array2::zeros((frame.height(), prices.instruments().len()));
        for (j, instrument) in prices.instruments().iter().enumerate() {
            let series = frame.column(&instrument.name)?.as_materialized_series();
            for (week, value) in series.f64()?.iter().enumerate() {
                match value {
                    Some(v) if v.is_finite() => values[[week, j]] = v,
                    _ => {
                        return Err(FactorError::NonFiniteReturn {
                            series: instrument.name.clone(),
                            week,
                        });
                    }
                }
            }
        }

        tracing::debug!(
            ?kind,
            weeks = values.nrows(),
            instruments = values.ncols(),
            "derived return table"
        );
        Ok(Self::assemble(
            kind,
            prices.dates()[1..].to_vec(),
            prices.instruments().to_vec(),
            values,
        ))
    }

    /// Build a table from already computed return columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column length differs from `dates`.
    pub fn from_columns(
        kind: ReturnKind,
        dates: Vec<NaiveDate>,
        columns: Vec<(Instrument, Vec<f64>)>,
    ) -> Result<Self> {
        let mut values = Array2::zeros((dates.len(), columns.len()));
        let mut instruments = Vec::with_capacity(columns.len());
        for (j, (instrument, series)) in columns.into_iter().enumerate() {
            if series.len() != dates.len() {
                return Err(FactorError::LengthMismatch {
                    what: instrument.name,
                    expected: dates.len(),
                    actual: series.len(),
                });
            }
            values.column_mut(j).assign(&ndarray::Array1::from(series));
            instruments.push(instrument);
        }
        Ok(Self::assemble(kind, dates, instruments, values))
    }

    fn assemble(
        kind: ReturnKind,
        dates: Vec<NaiveDate>,
        instruments: Vec<Instrument>,
        values: Array2<f64>,
    ) -> Self {
        let columns = instruments
            .iter()
            .enumerate()
            .map(|(j, i)| (i.name.clone(), j))
            .collect();
        Self {
            kind,
            dates,
            instruments,
            columns,
            values,
        }
    }

    /// Return convention of the table.
    pub const fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Dates of the returns (the later week of each pair).
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of weeks.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no weeks.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Instruments in column order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Whether an instrument has a return series.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Look up an instrument by name.
    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.columns.get(name).map(|&j| &self.instruments[j])
    }

    /// Return series of one instrument.
    ///
    /// # Errors
    ///
    /// Returns [`FactorError::MissingInstrument`] if the instrument is absent.
    pub fn series(&self, name: &str) -> Result<Vec<f64>> {
        let j = self.column_index(name)?;
        Ok(self.values.column(j).to_vec())
    }

    /// Sub-matrix of returns: `weeks` × `members`, members in the given order.
    ///
    /// # Errors
    ///
    /// Fails loudly when a member has no return series or the week range
    /// exceeds the table; both indicate a data alignment bug upstream.
    pub fn matrix<S: AsRef<str>>(&self, members: &[S], weeks: Range<usize>) -> Result<Array2<f64>> {
        self.check_weeks(&weeks)?;
        let cols = members
            .iter()
            .map(|m| self.column_index(m.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self
            .values
            .slice(ndarray::s![weeks, ..])
            .select(Axis(1), &cols))
    }

    pub(crate) fn check_weeks(&self, weeks: &Range<usize>) -> Result<()> {
        if weeks.start > weeks.end || weeks.end > self.len() {
            return Err(FactorError::WeekOutOfRange {
                start: weeks.start,
                end: weeks.end,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| FactorError::MissingInstrument(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ffcapm_data::Exchange;
    use rstest::rstest;

    fn weeks(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2016, 1, 8).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::weeks(i as i64))
            .collect()
    }

    fn table() -> PriceTable {
        PriceTable::new(
            "prices",
            weeks(4),
            vec![
                (
                    Instrument::new("600048.SH", Exchange::Shanghai),
                    vec![10.0, 11.0, 9.9, 9.9],
                ),
                (
                    Instrument::new("000002.SZ", Exchange::Shenzhen),
                    vec![20.0, 20.0, 25.0, 20.0],
                ),
            ],
        )
        .unwrap()
    }

    #[rstest]
    #[case(ReturnKind::Ratio, [1.1, 0.9, 1.0])]
    #[case(ReturnKind::Simple, [0.1, -0.1, 0.0])]
    #[case(ReturnKind::Log, [1.1f64.ln(), 0.9f64.ln(), 0.0])]
    fn test_table_matches_scalar_derivation(#[case] kind: ReturnKind, #[case] expected: [f64; 3]) {
        let returns = ReturnTable::from_prices(&table(), kind).unwrap();
        let series = returns.series("600048.SH").unwrap();
        assert_eq!(series.len(), 3);
        for (got, want) in series.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }

        let scalar = derive_returns("x", &[10.0, 11.0, 9.9, 9.9], kind).unwrap();
        for (a, b) in series.iter().zip(&scalar) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_length_is_one_shorter_and_dates_shift() {
        let prices = table();
        let returns = ReturnTable::from_prices(&prices, ReturnKind::Simple).unwrap();
        assert_eq!(returns.len(), prices.len() - 1);
        assert_eq!(returns.dates(), &prices.dates()[1..]);
        assert_relative_eq!(returns.series("000002.SZ").unwrap()[2], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_selects_members_in_order() {
        let returns = ReturnTable::from_prices(&table(), ReturnKind::Simple).unwrap();
        let m = returns.matrix(&["000002.SZ", "600048.SH"], 1..3).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert_relative_eq!(m[[0, 0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(m[[0, 1]], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_fails_on_unknown_member() {
        let returns = ReturnTable::from_prices(&table(), ReturnKind::Simple).unwrap();
        let err = returns.matrix(&["601155.SH"], 0..3).unwrap_err();
        assert!(matches!(err, FactorError::MissingInstrument(ref n) if n == "601155.SH"));
    }

    #[test]
    fn test_matrix_fails_on_week_overflow() {
        let returns = ReturnTable::from_prices(&table(), ReturnKind::Simple).unwrap();
        let err = returns.matrix(&["600048.SH"], 2..5).unwrap_err();
        assert!(matches!(err, FactorError::WeekOutOfRange { len: 3, .. }));
    }

    #[test]
    fn test_single_level_is_rejected() {
        let err = derive_returns("x", &[1.0], ReturnKind::Log).unwrap_err();
        assert!(matches!(err, FactorError::InsufficientData { .. }));
    }
}
