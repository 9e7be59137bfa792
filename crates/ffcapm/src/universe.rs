//! Market scopes and the stock universes they select.
//!
//! The CAPM study runs every regression three times: over the whole sector
//! and over the Shanghai and Shenzhen listings on their own.

use crate::error::{Error, Result};
use ffcapm_data::{Exchange, Instrument};
use ffcapm_factors::ExchangeWeights;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

/// Which listings a CAPM run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketScope {
    /// Both exchanges
    #[serde(rename = "sh_sz")]
    All,
    /// Shanghai listings only
    #[serde(rename = "sh")]
    Shanghai,
    /// Shenzhen listings only
    #[serde(rename = "sz")]
    Shenzhen,
}

impl MarketScope {
    /// Scopes in reporting order.
    pub const ALL: [Self; 3] = [Self::All, Self::Shanghai, Self::Shenzhen];

    /// Label used in section names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "sh_sz",
            Self::Shanghai => "sh",
            Self::Shenzhen => "sz",
        }
    }

    /// The single exchange of a one-exchange scope.
    pub const fn exchange(self) -> Option<Exchange> {
        match self {
            Self::All => None,
            Self::Shanghai => Some(Exchange::Shanghai),
            Self::Shenzhen => Some(Exchange::Shenzhen),
        }
    }

    /// Whether listings on `exchange` fall in this scope.
    pub fn includes(self, exchange: Exchange) -> bool {
        self.exchange().is_none_or(|e| e == exchange)
    }

    /// Select the instruments of this scope, keeping their order.
    pub fn select(self, instruments: &[Instrument]) -> ScopedUniverse<'_> {
        ScopedUniverse {
            scope: self,
            instruments: instruments
                .iter()
                .filter(|i| self.includes(i.exchange))
                .collect(),
        }
    }
}

impl fmt::Display for MarketScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MarketScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown market scope '{s}'")))
    }
}

/// The instruments of one scope.
#[derive(Debug, Clone)]
pub struct ScopedUniverse<'a> {
    scope: MarketScope,
    instruments: Vec<&'a Instrument>,
}

impl<'a> ScopedUniverse<'a> {
    /// Scope the universe was selected for.
    pub const fn scope(&self) -> MarketScope {
        self.scope
    }

    /// Selected instruments in input order.
    pub fn instruments(&self) -> &[&'a Instrument] {
        &self.instruments
    }

    /// Whether the scope selected nothing.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Share of the selected instruments listed on each exchange.
    ///
    /// A one-exchange scope puts all weight on its own index.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope selected no instrument.
    pub fn exchange_weights(&self) -> Result<ExchangeWeights> {
        Ok(ExchangeWeights::from_instruments(
            self.scope.label(),
            self.instruments.iter().copied(),
        )?)
    }
}

impl Universe for ScopedUniverse<'_> {
    fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn panel() -> Vec<Instrument> {
        vec![
            Instrument::new("000002.SZ", Exchange::Shenzhen),
            Instrument::new("600048.SH", Exchange::Shanghai),
            Instrument::new("000069.SZ", Exchange::Shenzhen),
            Instrument::new("600383.SH", Exchange::Shanghai),
            Instrument::new("600340.SH", Exchange::Shanghai),
        ]
    }

    #[rstest]
    #[case(MarketScope::All, 5)]
    #[case(MarketScope::Shanghai, 3)]
    #[case(MarketScope::Shenzhen, 2)]
    fn test_scope_selection(#[case] scope: MarketScope, #[case] expected: usize) {
        let instruments = panel();
        let universe = scope.select(&instruments);
        assert_eq!(universe.size(), expected);
        assert!(
            universe
                .instruments()
                .iter()
                .all(|i| scope.includes(i.exchange))
        );
    }

    #[test]
    fn test_selection_keeps_input_order() {
        let instruments = panel();
        let universe = MarketScope::Shanghai.select(&instruments);
        assert_eq!(
            universe.symbols(),
            vec!["600048.SH", "600383.SH", "600340.SH"]
        );
        assert_eq!(universe.size(), 3);
    }

    #[test]
    fn test_exchange_weights() {
        let instruments = panel();
        let all = MarketScope::All.select(&instruments).exchange_weights().unwrap();
        assert_relative_eq!(all.shanghai, 0.6);
        assert_relative_eq!(all.shenzhen, 0.4);

        let sz = MarketScope::Shenzhen
            .select(&instruments)
            .exchange_weights()
            .unwrap();
        assert_eq!(sz, ExchangeWeights::only(Exchange::Shenzhen));
    }

    #[test]
    fn test_empty_scope_has_no_weights() {
        let instruments = vec![Instrument::new("000002.SZ", Exchange::Shenzhen)];
        let universe = MarketScope::Shanghai.select(&instruments);
        assert!(universe.is_empty());
        assert!(universe.exchange_weights().is_err());
    }

    #[test]
    fn test_labels_parse_back() {
        for scope in MarketScope::ALL {
            assert_eq!(scope.label().parse::<MarketScope>().unwrap(), scope);
        }
        assert!("hk".parse::<MarketScope>().is_err());
        assert_eq!(
            serde_json::to_string(&MarketScope::All).unwrap(),
            "\"sh_sz\""
        );
    }
}
