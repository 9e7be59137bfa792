//! Fama-French three-factor regressions on size/value bucket portfolios.
//!
//! Each sample year the universe is sorted into buckets by year-end market
//! value and book-to-market. Every bucket is value weighted with year-end
//! market values and held for that year's weeks. For each bucket the
//! regression is
//!
//! ```text
//! Z_p = a + b·Z_m + s·SMB + h·HML + e
//! ```
//!
//! where `Z_p` is the bucket excess return, `Z_m` the excess return of the
//! two exchange indices blended by the bucket's listing shares, and SMB and
//! HML are built from the excess returns of the same scheme's buckets.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use ffcapm_data::{Ff3Dataset, Instrument};
use ffcapm_factors::{
    Bucket, ExchangeWeights, FactorError, FactorModel, FactorSeries, GroupScheme, IndexReturns,
    PortfolioWeights, ReturnKind, ReturnTable, RiskFreeAlignment, SampleCalendar, WEEKS_PER_YEAR,
    YearGrouping, assign_buckets, excess_returns, regressor_names, weekly_risk_free,
    weighted_returns,
};
use ffcapm_output::{
    ExportFormat, Exporter, FactorSeriesRow, PortfolioExport, PortfolioHolding,
    RegressionSummary, SectionedReport, timestamped_path,
};
use ffcapm_regression::{LinearEstimator, OlsConfig, OrdinaryLeastSquares, design_matrix};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ops::Range,
    path::{Path, PathBuf},
};

/// File name prefix of the regression results.
pub const RESULTS_FILE_PREFIX: &str = "FF3_results";

/// File name prefix of the bucket membership export.
pub const HOLDINGS_FILE_PREFIX: &str = "FF3_holdings";

/// File name prefix of the factor series export.
pub const FACTORS_FILE_PREFIX: &str = "FF3_factors";

/// FF3 study settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ff3Config {
    /// Return definition for stocks (default: simple).
    pub stock_returns: ReturnKind,
    /// Return definition for the exchange indices (default: simple).
    pub index_returns: ReturnKind,
    /// Risk-free alignment (default: lagged by one week).
    pub risk_free: RiskFreeAlignment,
    /// Periods per year used to de-annualise the deposit rate.
    pub periods_per_year: f64,
    /// Fixed week ranges for 2016, 2017 and 2018; derived from the return
    /// dates when unset.
    pub week_ranges: Option<[Range<usize>; 3]>,
    /// Regression settings.
    pub ols: OlsConfig,
}

impl Default for Ff3Config {
    fn default() -> Self {
        Self {
            stock_returns: ReturnKind::Simple,
            index_returns: ReturnKind::Simple,
            risk_free: RiskFreeAlignment::Lagged,
            periods_per_year: WEEKS_PER_YEAR,
            week_ranges: None,
            ols: OlsConfig::default(),
        }
    }
}

/// Excess return series of one bucket over all sample years.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSeries {
    /// Bucket.
    pub bucket: Bucket,
    /// Bucket excess return `Z_p`.
    pub portfolio: Vec<f64>,
    /// Blended market excess return `Z_m`.
    pub market: Vec<f64>,
}

/// Regression inputs of one scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeSeries {
    /// Grouping scheme.
    pub scheme: GroupScheme,
    /// SMB and HML over all sample years.
    pub factors: FactorSeries,
    /// Bucket series in reporting order.
    pub buckets: Vec<BucketSeries>,
}

/// Derived series and yearly groupings of a loaded FF3 dataset.
#[derive(Debug)]
pub struct Ff3Study<'a> {
    dataset: &'a Ff3Dataset,
    config: Ff3Config,
    returns: ReturnTable,
    index_returns: IndexReturns,
    risk_free: Vec<f64>,
    calendar: SampleCalendar,
    groupings: Vec<YearGrouping>,
    estimator: OrdinaryLeastSquares,
}

impl<'a> Ff3Study<'a> {
    /// Derive returns, split the sample into years and group each year.
    ///
    /// # Errors
    ///
    /// Returns an error if a return cannot be derived, a year has no weeks,
    /// a snapshot value needed for sorting is missing or the regression
    /// settings are invalid.
    pub fn new(dataset: &'a Ff3Dataset, config: Ff3Config) -> Result<Self> {
        let returns = ReturnTable::from_prices(&dataset.prices, config.stock_returns)?;
        let index_returns = IndexReturns::from_market(&dataset.market, config.index_returns)?;
        let risk_free = weekly_risk_free(
            &dataset.market.risk_free_rate,
            config.risk_free,
            config.periods_per_year,
        )?;
        if index_returns.len() != returns.len() || risk_free.len() != returns.len() {
            return Err(Error::Config(format!(
                "{} stock weeks, {} index weeks, {} risk-free weeks",
                returns.len(),
                index_returns.len(),
                risk_free.len()
            )));
        }

        let calendar = match &config.week_ranges {
            Some(ranges) => SampleCalendar::from_ranges(ranges.clone(), returns.len())?,
            None => SampleCalendar::from_dates(returns.dates())?,
        };
        // Sorting starts from the market-cap sheet's row order, which decides ties.
        if let Some(missing) = returns
            .instruments()
            .iter()
            .find(|i| !dataset.market_cap.contains(&i.name))
        {
            return Err(FactorError::MissingInstrument(missing.name.clone()).into());
        }
        let universe: Vec<&str> = dataset
            .market_cap
            .instruments()
            .iter()
            .map(String::as_str)
            .filter(|name| returns.contains(name))
            .collect();
        let groupings = calendar
            .iter()
            .map(|(year, _)| {
                assign_buckets(
                    &universe,
                    &dataset.market_cap,
                    &dataset.book_to_market,
                    year,
                )
            })
            .collect::<std::result::Result<Vec<_>, FactorError>>()?;
        let estimator = OrdinaryLeastSquares::new(config.ols.clone())?;

        tracing::info!(
            weeks = calendar.total_weeks(),
            stocks = universe.len(),
            years = groupings.len(),
            "prepared FF3 study"
        );
        Ok(Self {
            dataset,
            config,
            returns,
            index_returns,
            risk_free,
            calendar,
            groupings,
            estimator,
        })
    }

    /// Study settings.
    pub const fn config(&self) -> &Ff3Config {
        &self.config
    }

    /// Stock returns.
    pub const fn returns(&self) -> &ReturnTable {
        &self.returns
    }

    /// Weekly risk-free series aligned with the returns.
    pub fn risk_free(&self) -> &[f64] {
        &self.risk_free
    }

    /// Week range of every sample year.
    pub const fn calendar(&self) -> &SampleCalendar {
        &self.calendar
    }

    /// Groupings in chronological order.
    pub fn groupings(&self) -> &[YearGrouping] {
        &self.groupings
    }

    /// Dates of the weeks covered by the sample years, in order.
    pub fn sample_dates(&self) -> Vec<NaiveDate> {
        self.calendar
            .iter()
            .flat_map(|(_, weeks)| self.returns.dates()[weeks].to_vec())
            .collect()
    }

    fn years(&self) -> impl Iterator<Item = (&YearGrouping, Range<usize>)> + '_ {
        self.groupings
            .iter()
            .zip(self.calendar.iter().map(|(_, weeks)| weeks))
    }

    /// Year-end market value weights of one bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket is empty or a member's market value is unusable.
    pub fn bucket_weights(
        &self,
        grouping: &YearGrouping,
        scheme: GroupScheme,
        bucket: Bucket,
    ) -> Result<PortfolioWeights> {
        let members = grouping.scheme(scheme).members(bucket)?.to_vec();
        Ok(PortfolioWeights::market_cap(
            bucket_label(scheme, bucket),
            members,
            &self.dataset.market_cap,
            grouping.year.year_end(),
        )?)
    }

    fn member_instruments(&self, weights: &PortfolioWeights) -> Result<Vec<&Instrument>> {
        weights
            .members()
            .iter()
            .map(|name| {
                self.returns
                    .instrument(name)
                    .ok_or_else(|| Error::from(FactorError::MissingInstrument(name.clone())))
            })
            .collect()
    }

    /// Build the bucket and factor series of one scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if any bucket cannot be formed for any year.
    pub fn scheme_series(&self, scheme: GroupScheme) -> Result<SchemeSeries> {
        let mut buckets: Vec<BucketSeries> = scheme
            .buckets()
            .iter()
            .map(|&bucket| BucketSeries {
                bucket,
                portfolio: Vec::new(),
                market: Vec::new(),
            })
            .collect();
        let mut segments = Vec::with_capacity(self.groupings.len());

        for (grouping, weeks) in self.years() {
            let rf = &self.risk_free[weeks.clone()];
            let mut yearly = BTreeMap::new();
            for series in &mut buckets {
                let weights = self.bucket_weights(grouping, scheme, series.bucket)?;
                let portfolio = weighted_returns(&self.returns, &weights, weeks.clone())?;
                let portfolio = excess_returns(&portfolio, rf)?;

                let listing = ExchangeWeights::from_instruments(
                    weights.name(),
                    self.member_instruments(&weights)?,
                )?;
                let market = self.index_returns.blend(&listing, weeks.clone())?;
                let market = excess_returns(&market, rf)?;

                tracing::debug!(
                    year = %grouping.year,
                    bucket = weights.name(),
                    members = weights.len(),
                    shanghai = listing.shanghai,
                    "built bucket series"
                );
                series.portfolio.extend_from_slice(&portfolio);
                series.market.extend(market);
                yearly.insert(series.bucket, portfolio);
            }
            segments.push(FactorSeries::from_bucket_returns(&yearly, scheme)?);
        }

        Ok(SchemeSeries {
            scheme,
            factors: FactorSeries::concat(scheme, segments),
            buckets,
        })
    }

    /// Regress every bucket of a scheme on market, SMB and HML.
    ///
    /// # Errors
    ///
    /// Returns an error if a regression cannot be fitted.
    pub fn regress(&self, series: &SchemeSeries) -> Result<Vec<RegressionSummary>> {
        let regressors = regressor_names(FactorModel::FamaFrench3);
        series
            .buckets
            .iter()
            .map(|bucket| {
                let title = section_label(series.scheme, bucket.bucket);
                let x = design_matrix(&[
                    bucket.market.as_slice(),
                    series.factors.smb(),
                    series.factors.hml(),
                ])?;
                let fit = self
                    .estimator
                    .fit(&Array1::from(bucket.portfolio.clone()), &x)
                    .map_err(|e| Error::regression(&title, e))?;
                tracing::info!(
                    section = %title,
                    nobs = fit.nobs,
                    rsquared = fit.rsquared,
                    "fitted FF3 regression"
                );
                Ok(RegressionSummary::from_results(
                    &title,
                    "y",
                    &regressors,
                    &fit,
                )?)
            })
            .collect()
    }

    /// Bucket membership with weights and snapshot values, per year and scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if a bucket's weights cannot be formed.
    pub fn holdings(&self) -> Result<Vec<PortfolioExport>> {
        let mut out = Vec::new();
        for grouping in &self.groupings {
            let date = grouping.year.year_end();
            for scheme in GroupScheme::ALL {
                for &bucket in scheme.buckets() {
                    let weights = self.bucket_weights(grouping, scheme, bucket)?;
                    let holdings = weights
                        .iter()
                        .map(|(name, weight)| {
                            Ok(PortfolioHolding::new(
                                name.to_string(),
                                weight,
                                Some(self.dataset.market_cap.value(name, date)?),
                                Some(self.dataset.book_to_market.value(name, date)?),
                            ))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    out.push(PortfolioExport::new(
                        weights.name().to_string(),
                        date,
                        holdings,
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Both schemes in order: four groups, then six groups.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any scheme.
    pub fn run(&self) -> Result<Ff3Results> {
        let mut summaries = Vec::new();
        let mut factors = Vec::new();
        for scheme in GroupScheme::ALL {
            let series = self.scheme_series(scheme)?;
            summaries.extend(self.regress(&series)?);
            factors.push(series.factors);
        }
        Ok(Ff3Results {
            summaries,
            factors,
            factor_dates: self.sample_dates(),
            holdings: self.holdings()?,
        })
    }
}

/// Name of a bucket portfolio, e.g. `4_groups_SL`.
pub fn bucket_label(scheme: GroupScheme, bucket: Bucket) -> String {
    format!("{}_{}", scheme.label(), bucket.code())
}

/// Section label of a bucket regression, e.g. `name_4_groups_SL`.
pub fn section_label(scheme: GroupScheme, bucket: Bucket) -> String {
    format!("name_{}", bucket_label(scheme, bucket))
}

/// Results of a full FF3 run.
#[derive(Debug, Clone)]
pub struct Ff3Results {
    /// Bucket regressions, scheme by scheme in bucket order.
    pub summaries: Vec<RegressionSummary>,
    /// Factor series per scheme.
    pub factors: Vec<FactorSeries>,
    /// Dates of the factor series weeks.
    pub factor_dates: Vec<NaiveDate>,
    /// Bucket membership per year and scheme.
    pub holdings: Vec<PortfolioExport>,
}

/// Paths written by [`Ff3Results::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ff3Outputs {
    /// Regression summaries.
    pub results: PathBuf,
    /// Bucket membership.
    pub holdings: PathBuf,
    /// Factor series.
    pub factors: PathBuf,
}

impl Ff3Results {
    /// Summaries as one report, a section per bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if a summary cannot be rendered.
    pub fn report(&self, format: ExportFormat) -> Result<SectionedReport> {
        let mut report = SectionedReport::new(format);
        for summary in &self.summaries {
            report.push(summary.title.clone(), summary)?;
        }
        Ok(report)
    }

    /// Factor series flattened to dated rows, scheme by scheme.
    pub fn factor_rows(&self) -> Vec<FactorSeriesRow> {
        self.factors
            .iter()
            .flat_map(|series| {
                self.factor_dates
                    .iter()
                    .zip(series.smb().iter().zip(series.hml()))
                    .map(|(date, (smb, hml))| FactorSeriesRow {
                        date: *date,
                        scheme: series.scheme.label().to_string(),
                        smb: *smb,
                        hml: *hml,
                    })
            })
            .collect()
    }

    /// Write the results, holdings and factor files into `dir`, stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write(&self, dir: &Path, format: ExportFormat, at: NaiveDateTime) -> Result<Ff3Outputs> {
        let results = timestamped_path(dir, RESULTS_FILE_PREFIX, at, format);
        self.report(format)?.write_file(&results)?;
        let holdings = timestamped_path(dir, HOLDINGS_FILE_PREFIX, at, format);
        self.holdings.export_to_file(&holdings, format)?;
        let factors = timestamped_path(dir, FACTORS_FILE_PREFIX, at, format);
        self.factor_rows().export_to_file(&factors, format)?;
        tracing::info!(
            results = %results.display(),
            holdings = %holdings.display(),
            factors = %factors.display(),
            "wrote FF3 outputs"
        );
        Ok(Ff3Outputs {
            results,
            holdings,
            factors,
        })
    }
}
