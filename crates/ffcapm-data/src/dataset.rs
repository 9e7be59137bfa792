//! Loaded study inputs.
//!
//! [`CapmDataset`] and [`Ff3Dataset`] are the immutable contexts every
//! derivation borrows from. They are built once at start-up from a layout
//! and never modified afterwards.

use crate::{
    config::{CapmLayout, ColumnRef, Ff3Layout, InstrumentSelection},
    error::{DataError, Result},
    panel::{Exchange, Instrument, PriceTable, ensure_positive},
    sheet::RawSheet,
    snapshot::SnapshotTable,
};
use chrono::NaiveDate;

/// Deposit rate and exchange index levels sharing the price table's dates.
#[derive(Debug, Clone)]
pub struct MarketSeries {
    /// Week-ending dates.
    pub dates: Vec<NaiveDate>,
    /// Annualised deposit rate.
    pub risk_free_rate: Vec<f64>,
    /// Shanghai composite index level.
    pub shanghai_index: Vec<f64>,
    /// Shenzhen component index level.
    pub shenzhen_index: Vec<f64>,
}

impl MarketSeries {
    /// Assemble market series, checking that all lengths agree.
    ///
    /// # Errors
    ///
    /// Returns an error on length mismatch or non-positive index levels.
    pub fn new(
        dates: Vec<NaiveDate>,
        risk_free_rate: Vec<f64>,
        shanghai_index: Vec<f64>,
        shenzhen_index: Vec<f64>,
    ) -> Result<Self> {
        for (label, series) in [
            ("risk_free_rate", &risk_free_rate),
            ("shanghai_index", &shanghai_index),
            ("shenzhen_index", &shenzhen_index),
        ] {
            if series.len() != dates.len() {
                return Err(DataError::Misaligned {
                    left: "market".to_string(),
                    right: label.to_string(),
                    reason: format!("{} values for {} dates", series.len(), dates.len()),
                });
            }
        }
        ensure_positive("shanghai_index", &dates, &shanghai_index)?;
        ensure_positive("shenzhen_index", &dates, &shenzhen_index)?;
        Ok(Self {
            dates,
            risk_free_rate,
            shanghai_index,
            shenzhen_index,
        })
    }

    fn from_sheet(
        sheet: &RawSheet,
        risk_free: &ColumnRef,
        shanghai: &ColumnRef,
        shenzhen: &ColumnRef,
    ) -> Result<Self> {
        Self::new(
            sheet.dates()?,
            sheet.numeric_column(sheet.resolve(risk_free)?)?,
            sheet.numeric_column(sheet.resolve(shanghai)?)?,
            sheet.numeric_column(sheet.resolve(shenzhen)?)?,
        )
    }
}

/// Inputs of the CAPM study.
#[derive(Debug, Clone)]
pub struct CapmDataset {
    /// Rate and index series.
    pub market: MarketSeries,
    /// Stock closing prices.
    pub prices: PriceTable,
    /// Optional market-cap snapshot for value weighting.
    pub market_cap: Option<SnapshotTable>,
}

impl CapmDataset {
    /// Load the CAPM workbook described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns an error on any malformed input; nothing is partially loaded.
    pub fn load(layout: &CapmLayout) -> Result<Self> {
        let sheet = RawSheet::read(&layout.sheet)?;
        let market = MarketSeries::from_sheet(
            &sheet,
            &layout.risk_free,
            &layout.shanghai_index,
            &layout.shenzhen_index,
        )?;
        let prices = price_table(&sheet, &layout.instruments, market.dates.clone())?;
        let market_cap = layout
            .market_cap
            .as_ref()
            .map(|source| SnapshotTable::from_sheet(&RawSheet::read(source)?))
            .transpose()?;

        tracing::info!(
            weeks = prices.len(),
            instruments = prices.instruments().len(),
            value_weighted = market_cap.is_some(),
            "loaded CAPM dataset"
        );
        Self::new(market, prices, market_cap)
    }

    /// Assemble a dataset from already validated parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the price and market dates differ.
    pub fn new(
        market: MarketSeries,
        prices: PriceTable,
        market_cap: Option<SnapshotTable>,
    ) -> Result<Self> {
        ensure_same_dates("market", &market.dates, "prices", prices.dates())?;
        Ok(Self {
            market,
            prices,
            market_cap,
        })
    }
}

/// Inputs of the FF3 study.
#[derive(Debug, Clone)]
pub struct Ff3Dataset {
    /// Rate and index series.
    pub market: MarketSeries,
    /// Stock closing prices.
    pub prices: PriceTable,
    /// Year-end total market value.
    pub market_cap: SnapshotTable,
    /// Year-end book-to-market ratio.
    pub book_to_market: SnapshotTable,
}

impl Ff3Dataset {
    /// Load the FF3 workbook described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns an error on any malformed input, including price and index
    /// sheets whose dates differ.
    pub fn load(layout: &Ff3Layout) -> Result<Self> {
        let index_sheet = RawSheet::read(&layout.indices)?;
        let market = MarketSeries::from_sheet(
            &index_sheet,
            &layout.risk_free,
            &layout.shanghai_index,
            &layout.shenzhen_index,
        )?;

        let price_sheet = RawSheet::read(&layout.prices)?;
        let price_dates = price_sheet.dates()?;
        ensure_same_dates(
            index_sheet.name(),
            &market.dates,
            price_sheet.name(),
            &price_dates,
        )?;
        let prices = price_table(&price_sheet, &layout.instruments, price_dates)?;

        let market_cap = SnapshotTable::from_sheet(&RawSheet::read(&layout.market_cap)?)?;
        let book_to_market = SnapshotTable::from_sheet(&RawSheet::read(&layout.book_to_market)?)?;

        tracing::info!(
            weeks = prices.len(),
            instruments = prices.instruments().len(),
            snapshot_rows = market_cap.instruments().len(),
            "loaded FF3 dataset"
        );
        Self::new(market, prices, market_cap, book_to_market)
    }

    /// Assemble a dataset from already validated parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the price and market dates differ.
    pub fn new(
        market: MarketSeries,
        prices: PriceTable,
        market_cap: SnapshotTable,
        book_to_market: SnapshotTable,
    ) -> Result<Self> {
        ensure_same_dates("market", &market.dates, "prices", prices.dates())?;
        Ok(Self {
            market,
            prices,
            market_cap,
            book_to_market,
        })
    }
}

fn price_table(
    sheet: &RawSheet,
    selections: &[InstrumentSelection],
    dates: Vec<NaiveDate>,
) -> Result<PriceTable> {
    let mut columns = Vec::new();
    for selection in selections {
        for pos in sheet.select(&selection.columns)? {
            let name = &sheet.headers()[pos];
            let exchange = selection
                .exchange
                .or_else(|| Exchange::from_ticker(name))
                .ok_or_else(|| DataError::UnknownExchange(name.clone()))?;
            columns.push((
                Instrument::new(name.clone(), exchange),
                sheet.numeric_column(pos)?,
            ));
        }
    }
    PriceTable::new(sheet.name(), dates, columns)
}

fn ensure_same_dates(
    left: &str,
    left_dates: &[NaiveDate],
    right: &str,
    right_dates: &[NaiveDate],
) -> Result<()> {
    if left_dates.len() != right_dates.len() {
        return Err(DataError::Misaligned {
            left: left.to_string(),
            right: right.to_string(),
            reason: format!("{} rows vs {} rows", left_dates.len(), right_dates.len()),
        });
    }
    match left_dates.iter().zip(right_dates).find(|(a, b)| a != b) {
        Some((a, b)) => Err(DataError::Misaligned {
            left: left.to_string(),
            right: right.to_string(),
            reason: format!("{a} vs {b}"),
        }),
        None => Ok(()),
    }
}
