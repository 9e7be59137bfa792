//! CAPM regressions per stock and per sector portfolio.
//!
//! For every [`MarketScope`] the market return is the exchange-index return
//! blended by the share of the scope's stocks listed on each exchange.
//!
//! * Single-stock runs regress each stock's return on that market return.
//! * Portfolio runs regress the portfolio's excess return `R_p - R_f` on
//!   the market excess return `R_m - R_f`.

use crate::{
    error::{Error, Result},
    universe::{MarketScope, ScopedUniverse, Universe},
};
use chrono::{NaiveDate, NaiveDateTime};
use ffcapm_data::CapmDataset;
use ffcapm_factors::{
    FactorModel, IndexReturns, PortfolioWeights, ReturnKind, ReturnTable, RiskFreeAlignment,
    WEEKS_PER_YEAR, Weighting, excess_returns, regressor_names, weekly_risk_free,
    weighted_returns,
};
use ffcapm_output::{
    ExportFormat, RegressionSummary, SectionedReport, StockRegressionRow, StockRegressionTable,
    timestamped_path,
};
use ffcapm_regression::{LinearEstimator, OlsConfig, OrdinaryLeastSquares, design_matrix};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name prefix of the single-stock results.
pub const STOCKS_FILE_PREFIX: &str = "CAPM_result_by_stocks_";

/// File name prefix of the portfolio results.
pub const PORTFOLIO_FILE_PREFIX: &str = "CAPM_result_by_port";

/// CAPM study settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapmConfig {
    /// Return definition for stocks (default: price ratio).
    pub stock_returns: ReturnKind,
    /// Return definition for the exchange indices (default: log).
    pub index_returns: ReturnKind,
    /// Risk-free alignment in portfolio runs (default: contemporaneous).
    pub risk_free: RiskFreeAlignment,
    /// Periods per year used to de-annualise the deposit rate.
    pub periods_per_year: f64,
    /// Portfolio weighting scheme.
    pub weighting: Weighting,
    /// Snapshot date for market-cap weights; the latest snapshot date when unset.
    pub market_cap_date: Option<NaiveDate>,
    /// Regression settings.
    pub ols: OlsConfig,
}

impl Default for CapmConfig {
    fn default() -> Self {
        Self {
            stock_returns: ReturnKind::Ratio,
            index_returns: ReturnKind::Log,
            risk_free: RiskFreeAlignment::Contemporaneous,
            periods_per_year: WEEKS_PER_YEAR,
            weighting: Weighting::Equal,
            market_cap_date: None,
            ols: OlsConfig::default(),
        }
    }
}

/// Derived series of a loaded CAPM dataset, ready for regression.
#[derive(Debug)]
pub struct CapmStudy<'a> {
    dataset: &'a CapmDataset,
    config: CapmConfig,
    stock_returns: ReturnTable,
    index_returns: IndexReturns,
    risk_free: Vec<f64>,
    estimator: OrdinaryLeastSquares,
}

impl<'a> CapmStudy<'a> {
    /// Derive returns and the weekly risk-free series.
    ///
    /// # Errors
    ///
    /// Returns an error if a return cannot be derived, the derived series
    /// disagree in length or the regression settings are invalid.
    pub fn new(dataset: &'a CapmDataset, config: CapmConfig) -> Result<Self> {
        if config.weighting == Weighting::MarketCap && dataset.market_cap.is_none() {
            return Err(Error::Config(
                "market-cap weighting needs a market-cap snapshot".to_string(),
            ));
        }
        let stock_returns = ReturnTable::from_prices(&dataset.prices, config.stock_returns)?;
        let index_returns = IndexReturns::from_market(&dataset.market, config.index_returns)?;
        let risk_free = weekly_risk_free(
            &dataset.market.risk_free_rate,
            config.risk_free,
            config.periods_per_year,
        )?;
        if index_returns.len() != stock_returns.len() || risk_free.len() != stock_returns.len() {
            return Err(Error::Config(format!(
                "{} stock weeks, {} index weeks, {} risk-free weeks",
                stock_returns.len(),
                index_returns.len(),
                risk_free.len()
            )));
        }
        let estimator = OrdinaryLeastSquares::new(config.ols.clone())?;

        tracing::info!(
            weeks = stock_returns.len(),
            stocks = stock_returns.instruments().len(),
            weighting = ?config.weighting,
            "prepared CAPM study"
        );
        Ok(Self {
            dataset,
            config,
            stock_returns,
            index_returns,
            risk_free,
            estimator,
        })
    }

    /// Study settings.
    pub const fn config(&self) -> &CapmConfig {
        &self.config
    }

    /// Number of return weeks.
    pub fn weeks(&self) -> usize {
        self.stock_returns.len()
    }

    /// Stock returns used by every run.
    pub const fn stock_returns(&self) -> &ReturnTable {
        &self.stock_returns
    }

    /// Weekly risk-free series aligned with the returns.
    pub fn risk_free(&self) -> &[f64] {
        &self.risk_free
    }

    /// Stocks of one scope.
    pub fn universe(&self, scope: MarketScope) -> ScopedUniverse<'_> {
        scope.select(self.stock_returns.instruments())
    }

    /// Blended market return of one scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope selects no stock.
    pub fn market_returns(&self, scope: MarketScope) -> Result<Vec<f64>> {
        let weights = self.universe(scope).exchange_weights()?;
        Ok(self.index_returns.blend(&weights, 0..self.weeks())?)
    }

    /// Regress every stock of the scope on the scope's market return.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope is empty or a regression cannot be fitted.
    pub fn run_single_stocks(&self, scope: MarketScope) -> Result<StockRegressionTable> {
        let market = self.market_returns(scope)?;
        let x = design_matrix(&[market.as_slice()])?;
        let universe = self.universe(scope);

        let mut rows = Vec::with_capacity(universe.size());
        for instrument in universe.instruments() {
            let y = Array1::from(self.stock_returns.series(&instrument.name)?);
            let fit = self
                .estimator
                .fit(&y, &x)
                .map_err(|e| Error::regression(format!("{} ({scope})", instrument.name), e))?;
            rows.push(StockRegressionRow::new(
                instrument.name.clone(),
                fit.beta().unwrap_or(f64::NAN),
                fit.rsquared,
                fit.beta_pvalue().unwrap_or(f64::NAN),
            ));
        }

        tracing::info!(%scope, stocks = rows.len(), "fitted single-stock CAPM");
        Ok(StockRegressionTable::new(scope.label().to_string(), rows))
    }

    /// Weights of the scope's sector portfolio.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope is empty or a market-cap value is unusable.
    pub fn portfolio_weights(&self, scope: MarketScope) -> Result<PortfolioWeights> {
        let name = portfolio_label(scope);
        let members = self.universe(scope).symbols();
        match (self.config.weighting, self.dataset.market_cap.as_ref()) {
            (Weighting::MarketCap, Some(snapshot)) => {
                let date = self
                    .config
                    .market_cap_date
                    .or_else(|| snapshot.dates().last().copied())
                    .ok_or_else(|| {
                        Error::Config(format!("snapshot '{}' has no dates", snapshot.name()))
                    })?;
                Ok(PortfolioWeights::market_cap(name, members, snapshot, date)?)
            }
            _ => Ok(PortfolioWeights::equal(name, members)?),
        }
    }

    /// Regress the scope portfolio's excess return on the market excess return.
    ///
    /// # Errors
    ///
    /// Returns an error if the portfolio cannot be formed or the regression fails.
    pub fn run_portfolio(&self, scope: MarketScope) -> Result<RegressionSummary> {
        let label = portfolio_label(scope);
        let weights = self.portfolio_weights(scope)?;
        let portfolio = weighted_returns(&self.stock_returns, &weights, 0..self.weeks())?;
        let y = excess_returns(&portfolio, &self.risk_free)?;
        let x = excess_returns(&self.market_returns(scope)?, &self.risk_free)?;

        let fit = self
            .estimator
            .fit(&Array1::from(y), &design_matrix(&[x.as_slice()])?)
            .map_err(|e| Error::regression(&label, e))?;
        tracing::info!(
            %scope,
            members = weights.len(),
            beta = fit.beta().unwrap_or(f64::NAN),
            rsquared = fit.rsquared,
            "fitted portfolio CAPM"
        );
        Ok(RegressionSummary::from_results(
            &label,
            "y",
            &regressor_names(FactorModel::Capm),
            &fit,
        )?)
    }

    /// Run every scope, single stocks first, in reporting order.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any run.
    pub fn run(&self) -> Result<CapmResults> {
        let stocks = MarketScope::ALL
            .into_iter()
            .map(|scope| self.run_single_stocks(scope))
            .collect::<Result<Vec<_>>>()?;
        let portfolios = MarketScope::ALL
            .into_iter()
            .map(|scope| self.run_portfolio(scope))
            .collect::<Result<Vec<_>>>()?;
        Ok(CapmResults { stocks, portfolios })
    }
}

/// Section label of a scope's portfolio regression.
pub fn portfolio_label(scope: MarketScope) -> String {
    format!("port_{}", scope.label())
}

/// Results of a full CAPM run, one entry per scope in reporting order.
#[derive(Debug, Clone)]
pub struct CapmResults {
    /// Per-stock tables.
    pub stocks: Vec<StockRegressionTable>,
    /// Portfolio summaries.
    pub portfolios: Vec<RegressionSummary>,
}

/// Paths written by [`CapmResults::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapmOutputs {
    /// Single-stock results.
    pub stocks: PathBuf,
    /// Portfolio results.
    pub portfolios: PathBuf,
}

impl CapmResults {
    /// Single-stock tables as one report, a section per scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be rendered.
    pub fn stock_report(&self, format: ExportFormat) -> Result<SectionedReport> {
        let mut report = SectionedReport::new(format);
        for table in &self.stocks {
            report.push(table.scope.clone(), table)?;
        }
        Ok(report)
    }

    /// Portfolio summaries as one report.
    ///
    /// # Errors
    ///
    /// Returns an error if a summary cannot be rendered.
    pub fn portfolio_report(&self, format: ExportFormat) -> Result<SectionedReport> {
        let mut report = SectionedReport::new(format);
        for summary in &self.portfolios {
            report.push(summary.title.clone(), summary)?;
        }
        Ok(report)
    }

    /// Write both result files into `dir`, stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write(&self, dir: &Path, format: ExportFormat, at: NaiveDateTime) -> Result<CapmOutputs> {
        let stocks = timestamped_path(dir, STOCKS_FILE_PREFIX, at, format);
        self.stock_report(format)?.write_file(&stocks)?;
        let portfolios = timestamped_path(dir, PORTFOLIO_FILE_PREFIX, at, format);
        self.portfolio_report(format)?.write_file(&portfolios)?;
        Ok(CapmOutputs { stocks, portfolios })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ffcapm_data::{Exchange, Instrument, MarketSeries, PriceTable, SnapshotTable};

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2016, 1, 8).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::weeks(i as i64))
            .collect()
    }

    fn dataset(market_cap: Option<SnapshotTable>) -> CapmDataset {
        let d = dates(8);
        let market = MarketSeries::new(
            d.clone(),
            vec![1.5, 1.5, 1.6, 1.6, 1.5, 1.4, 1.4, 1.5],
            vec![3000.0, 3030.0, 2990.0, 3050.0, 3100.0, 3080.0, 3120.0, 3150.0],
            vec![10000.0, 10150.0, 9950.0, 10100.0, 10300.0, 10250.0, 10400.0, 10350.0],
        )
        .unwrap();
        let prices = PriceTable::new(
            "new",
            d,
            vec![
                (
                    Instrument::new("000002.SZ", Exchange::Shenzhen),
                    vec![20.0, 20.4, 19.8, 20.5, 21.0, 20.8, 21.5, 21.2],
                ),
                (
                    Instrument::new("600048.SH", Exchange::Shanghai),
                    vec![10.0, 10.1, 9.9, 10.3, 10.2, 10.4, 10.6, 10.5],
                ),
                (
                    Instrument::new("600383.SH", Exchange::Shanghai),
                    vec![5.0, 5.1, 4.9, 5.2, 5.3, 5.2, 5.4, 5.5],
                ),
            ],
        )
        .unwrap();
        CapmDataset::new(market, prices, market_cap).unwrap()
    }

    #[test]
    fn test_lengths_align() {
        let data = dataset(None);
        let study = CapmStudy::new(&data, CapmConfig::default()).unwrap();
        assert_eq!(study.weeks(), 7);
        assert_eq!(study.risk_free().len(), 7);
        assert_relative_eq!(study.risk_free()[0], 1.5 / 52.0);
    }

    #[test]
    fn test_single_stock_rows_follow_scope() {
        let data = dataset(None);
        let study = CapmStudy::new(&data, CapmConfig::default()).unwrap();
        let sh = study.run_single_stocks(MarketScope::Shanghai).unwrap();
        assert_eq!(sh.scope, "sh");
        let names: Vec<&str> = sh.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["600048.SH", "600383.SH"]);
        assert!(sh.rows.iter().all(|r| r.beta.is_finite()));
    }

    #[test]
    fn test_one_exchange_market_is_its_index() {
        let data = dataset(None);
        let study = CapmStudy::new(&data, CapmConfig::default()).unwrap();
        let market = study.market_returns(MarketScope::Shenzhen).unwrap();
        assert_relative_eq!(market[0], (10150.0f64 / 10000.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_summary_labels() {
        let data = dataset(None);
        let study = CapmStudy::new(&data, CapmConfig::default()).unwrap();
        let summary = study.run_portfolio(MarketScope::All).unwrap();
        assert_eq!(summary.title, "port_sh_sz");
        assert_eq!(summary.nobs, 7);
        let names: Vec<&str> = summary.coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["const", "MKT"]);
    }

    #[test]
    fn test_market_cap_weighting_needs_snapshot() {
        let data = dataset(None);
        let config = CapmConfig {
            weighting: Weighting::MarketCap,
            ..CapmConfig::default()
        };
        assert!(matches!(
            CapmStudy::new(&data, config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_market_cap_weights_use_latest_snapshot() {
        let snapshot = SnapshotTable::new(
            "market_cap",
            vec![
                "000002.SZ".to_string(),
                "600048.SH".to_string(),
                "600383.SH".to_string(),
            ],
            vec![
                NaiveDate::from_ymd_opt(2015, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2016, 12, 30).unwrap(),
            ],
            vec![
                vec![Some(1.0), Some(200.0)],
                vec![Some(1.0), Some(100.0)],
                vec![Some(1.0), Some(100.0)],
            ],
        )
        .unwrap();
        let data = dataset(Some(snapshot));
        let config = CapmConfig {
            weighting: Weighting::MarketCap,
            ..CapmConfig::default()
        };
        let study = CapmStudy::new(&data, config).unwrap();
        let weights = study.portfolio_weights(MarketScope::All).unwrap();
        let w: Vec<f64> = weights.iter().map(|(_, w)| w).collect();
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 0.25);
    }

    #[test]
    fn test_run_orders_scopes() {
        let data = dataset(None);
        let study = CapmStudy::new(&data, CapmConfig::default()).unwrap();
        let results = study.run().unwrap();
        let scopes: Vec<&str> = results.stocks.iter().map(|t| t.scope.as_str()).collect();
        assert_eq!(scopes, vec!["sh_sz", "sh", "sz"]);
        let report = results.portfolio_report(ExportFormat::Csv).unwrap();
        assert_eq!(
            report.labels().collect::<Vec<_>>(),
            vec!["port_sh_sz", "port_sh", "port_sz"]
        );
    }
}
