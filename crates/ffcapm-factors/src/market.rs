//! Market return blending.
//!
//! The sector trades on two exchanges, each with its own index. A market
//! return for a set of stocks blends the two index returns by the share of
//! the set listed on each exchange.

use crate::{
    error::{FactorError, Result},
    returns::{ReturnKind, derive_returns},
};
use ffcapm_data::{Exchange, Instrument, MarketSeries};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Share of a stock set listed on each exchange. Sums to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeWeights {
    /// Shanghai share.
    pub shanghai: f64,
    /// Shenzhen share.
    pub shenzhen: f64,
}

impl ExchangeWeights {
    /// Count shares of the given instruments.
    ///
    /// # Errors
    ///
    /// Returns [`FactorError::EmptyPortfolio`] when no instrument is given.
    pub fn from_instruments<'a, I>(name: &str, instruments: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let (mut sh, mut sz) = (0usize, 0usize);
        for instrument in instruments {
            match instrument.exchange {
                Exchange::Shanghai => sh += 1,
                Exchange::Shenzhen => sz += 1,
            }
        }
        let total = sh + sz;
        if total == 0 {
            return Err(FactorError::EmptyPortfolio(name.to_string()));
        }
        Ok(Self {
            shanghai: sh as f64 / total as f64,
            shenzhen: sz as f64 / total as f64,
        })
    }

    /// All weight on one exchange.
    pub const fn only(exchange: Exchange) -> Self {
        match exchange {
            Exchange::Shanghai => Self {
                shanghai: 1.0,
                shenzhen: 0.0,
            },
            Exchange::Shenzhen => Self {
                shanghai: 0.0,
                shenzhen: 1.0,
            },
        }
    }
}

/// Weekly returns of both exchange indices.
#[derive(Debug, Clone)]
pub struct IndexReturns {
    shanghai: Vec<f64>,
    shenzhen: Vec<f64>,
}

impl IndexReturns {
    /// Derive index returns from the loaded market series.
    ///
    /// # Errors
    ///
    /// Returns an error if either index has fewer than two levels.
    pub fn from_market(market: &MarketSeries, kind: ReturnKind) -> Result<Self> {
        Ok(Self {
            shanghai: derive_returns("shanghai_index", &market.shanghai_index, kind)?,
            shenzhen: derive_returns("shenzhen_index", &market.shenzhen_index, kind)?,
        })
    }

    /// Number of weeks.
    pub fn len(&self) -> usize {
        self.shanghai.len()
    }

    /// Whether there are no weeks.
    pub fn is_empty(&self) -> bool {
        self.shanghai.is_empty()
    }

    /// Return series of one exchange index.
    pub fn series(&self, exchange: Exchange) -> &[f64] {
        match exchange {
            Exchange::Shanghai => &self.shanghai,
            Exchange::Shenzhen => &self.shenzhen,
        }
    }

    /// Blended market return for each week of `weeks`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range exceeds the available weeks.
    pub fn blend(&self, weights: &ExchangeWeights, weeks: Range<usize>) -> Result<Vec<f64>> {
        if weeks.start > weeks.end || weeks.end > self.len() {
            return Err(FactorError::WeekOutOfRange {
                start: weeks.start,
                end: weeks.end,
                len: self.len(),
            });
        }
        Ok(weeks
            .map(|t| self.shanghai[t] * weights.shanghai + self.shenzhen[t] * weights.shenzhen)
            .collect())
    }
}
