//! Ordinary least squares
//!
//! Fits `y = Xβ + ε` by Householder QR and reports the inference statistics
//! of a classical OLS summary: standard errors, t statistics, two-sided
//! p-values, confidence intervals, R², the overall F test, information
//! criteria and residual diagnostics.

use crate::{
    error::{RegressionError, Result},
    linalg::HouseholderQr,
};
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

/// OLS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsConfig {
    /// Prepend a column of ones to the regressors (default: true)
    pub add_intercept: bool,

    /// Two-sided confidence level of the parameter intervals (default: 0.95)
    pub confidence_level: f64,

    /// Override of the rank tolerance on `|R_ii|` (default: `max|R_ii| · max(n, p) · ε`)
    pub rank_tolerance: Option<f64>,
}

impl Default for OlsConfig {
    fn default() -> Self {
        Self {
            add_intercept: true,
            confidence_level: 0.95,
            rank_tolerance: None,
        }
    }
}

/// Trait for linear model estimators
pub trait LinearEstimator {
    /// Fit the model
    ///
    /// # Arguments
    /// * `y` - Dependent variable, one value per observation
    /// * `x` - Regressors, one row per observation and one column per regressor
    fn fit(&self, y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsResults>;
}

/// Prepend a column of ones
pub fn add_constant(x: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::ones((x.nrows(), x.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(x);
    out
}

/// Stack equal-length columns into a regressor matrix
///
/// # Errors
/// Returns [`RegressionError::DimensionMismatch`] if the columns differ in length.
pub fn design_matrix(columns: &[&[f64]]) -> Result<Array2<f64>> {
    let rows = columns.first().map_or(0, |c| c.len());
    let mut x = Array2::zeros((rows, columns.len()));
    for (j, column) in columns.iter().enumerate() {
        if column.len() != rows {
            return Err(RegressionError::DimensionMismatch {
                expected: rows,
                actual: column.len(),
            });
        }
        for (i, value) in column.iter().enumerate() {
            x[[i, j]] = *value;
        }
    }
    Ok(x)
}

/// Fitted OLS model
#[derive(Debug, Clone)]
pub struct OlsResults {
    /// Coefficients, intercept first when one was added
    pub params: Array1<f64>,
    /// Standard errors of the coefficients
    pub bse: Array1<f64>,
    /// t statistics
    pub tvalues: Array1<f64>,
    /// Two-sided p-values from Student's t with `df_resid` degrees of freedom
    pub pvalues: Array1<f64>,
    /// Confidence intervals, one `[lower, upper]` row per coefficient
    pub conf_int: Array2<f64>,
    /// Confidence level of `conf_int`
    pub confidence_level: f64,
    /// Coefficient of determination
    pub rsquared: f64,
    /// Adjusted R²
    pub rsquared_adj: f64,
    /// F statistic of the joint test that all slopes are zero
    pub fvalue: f64,
    /// p-value of the F statistic
    pub f_pvalue: f64,
    /// Gaussian log-likelihood
    pub llf: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Residual variance `ssr / df_resid`
    pub mse_resid: f64,
    /// Durbin-Watson statistic of the residuals
    pub durbin_watson: f64,
    /// Jarque-Bera statistic of the residuals
    pub jarque_bera: f64,
    /// p-value of the Jarque-Bera statistic (χ² with 2 degrees of freedom)
    pub jb_pvalue: f64,
    /// Residual skewness
    pub skew: f64,
    /// Residual kurtosis (not excess)
    pub kurtosis: f64,
    /// Residuals
    pub resid: Array1<f64>,
    /// Fitted values
    pub fitted: Array1<f64>,
    /// Number of observations
    pub nobs: usize,
    /// Model degrees of freedom (slopes)
    pub df_model: usize,
    /// Residual degrees of freedom
    pub df_resid: usize,
    /// Whether the first coefficient is an intercept
    pub has_intercept: bool,
}

impl OlsResults {
    /// Slope on the first non-constant regressor (the CAPM beta)
    pub fn beta(&self) -> Option<f64> {
        let offset = usize::from(self.has_intercept);
        self.params.get(offset).copied()
    }

    /// p-value of the first non-constant regressor
    pub fn beta_pvalue(&self) -> Option<f64> {
        let offset = usize::from(self.has_intercept);
        self.pvalues.get(offset).copied()
    }

    /// Number of estimated coefficients
    pub fn num_params(&self) -> usize {
        self.params.len()
    }
}

/// Ordinary least squares estimator
#[derive(Debug, Default)]
pub struct OrdinaryLeastSquares {
    config: OlsConfig,
}

impl OrdinaryLeastSquares {
    /// Create a new estimator with the given configuration
    ///
    /// # Errors
    /// Returns an error if the confidence level is not in (0, 1).
    pub fn new(config: OlsConfig) -> Result<Self> {
        if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
            return Err(RegressionError::InvalidParameter(format!(
                "confidence level {} must be between 0 and 1",
                config.confidence_level
            )));
        }
        Ok(Self { config })
    }

    /// Get the configuration
    pub const fn config(&self) -> &OlsConfig {
        &self.config
    }
}

impl LinearEstimator for OrdinaryLeastSquares {
    fn fit(&self, y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsResults> {
        if y.len() != x.nrows() {
            return Err(RegressionError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if !y.iter().all(|v| v.is_finite()) {
            return Err(RegressionError::NonFiniteInput("dependent variable"));
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(RegressionError::NonFiniteInput("regressors"));
        }

        let design = if self.config.add_intercept {
            add_constant(x)
        } else {
            x.clone()
        };
        let (n, k) = design.dim();
        if n < k + 1 {
            return Err(RegressionError::InsufficientObservations {
                required: k + 1,
                actual: n,
            });
        }

        let qr = HouseholderQr::decompose(design.view());
        let tolerance = self
            .config
            .rank_tolerance
            .unwrap_or_else(|| qr.rank_tolerance());
        let rank = qr.rank(tolerance);
        if rank < k {
            return Err(RegressionError::RankDeficient { rank, columns: k });
        }

        let params = qr.solve_least_squares(y.view());
        let fitted = design.dot(&params);
        let resid = y - &fitted;

        let df_resid = n - k;
        let df_model = k - usize::from(self.config.add_intercept);
        let ssr = resid.dot(&resid);
        let mse_resid = ssr / df_resid as f64;

        let tss = if self.config.add_intercept {
            let mean = y.sum() / n as f64;
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(y)
        };
        let rsquared = 1.0 - ssr / tss;
        let rsquared_adj = 1.0
            - (n - usize::from(self.config.add_intercept)) as f64 / df_resid as f64
                * (1.0 - rsquared);

        let cov_diag = qr.gram_inverse().diag().mapv(|v| v * mse_resid);
        let bse = cov_diag.mapv(f64::sqrt);
        let tvalues = &params / &bse;

        let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64).map_err(distribution)?;
        let pvalues = tvalues.mapv(|t| two_sided_pvalue(&t_dist, t));
        let alpha = 1.0 - self.config.confidence_level;
        let q = t_dist.inverse_cdf(1.0 - alpha / 2.0);
        let mut conf_int = Array2::zeros((k, 2));
        for i in 0..k {
            conf_int[[i, 0]] = params[i] - q * bse[i];
            conf_int[[i, 1]] = params[i] + q * bse[i];
        }

        let (fvalue, f_pvalue) = if df_model > 0 {
            let ess = tss - ssr;
            let f = (ess / df_model as f64) / mse_resid;
            let f_dist =
                FisherSnedecor::new(df_model as f64, df_resid as f64).map_err(distribution)?;
            (f, if f.is_finite() { f_dist.sf(f) } else { 0.0 })
        } else {
            (f64::NAN, f64::NAN)
        };

        let nobs = n as f64;
        let llf = -nobs / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nobs).ln() + 1.0);
        let aic = -2.0 * llf + 2.0 * k as f64;
        let bic = -2.0 * llf + nobs.ln() * k as f64;

        let durbin_watson = durbin_watson(resid.as_slice().unwrap_or(&[]), ssr);
        let moments = ResidualMoments::from_residuals(&resid);
        let jarque_bera = nobs / 6.0
            * (moments.skew.powi(2) + (moments.kurtosis - 3.0).powi(2) / 4.0);
        let jb_pvalue = if jarque_bera.is_finite() {
            ChiSquared::new(2.0).map_err(distribution)?.sf(jarque_bera)
        } else {
            f64::NAN
        };

        Ok(OlsResults {
            params,
            bse,
            tvalues,
            pvalues,
            conf_int,
            confidence_level: self.config.confidence_level,
            rsquared,
            rsquared_adj,
            fvalue,
            f_pvalue,
            llf,
            aic,
            bic,
            ssr,
            mse_resid,
            durbin_watson,
            jarque_bera,
            jb_pvalue,
            skew: moments.skew,
            kurtosis: moments.kurtosis,
            resid,
            fitted,
            nobs: n,
            df_model,
            df_resid,
            has_intercept: self.config.add_intercept,
        })
    }
}

fn distribution(err: impl std::fmt::Display) -> RegressionError {
    RegressionError::Distribution(err.to_string())
}

fn two_sided_pvalue(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        (2.0 * dist.sf(t.abs())).min(1.0)
    }
}

fn durbin_watson(resid: &[f64], ssr: f64) -> f64 {
    let num: f64 = resid.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    num / ssr
}

struct ResidualMoments {
    skew: f64,
    kurtosis: f64,
}

impl ResidualMoments {
    fn from_residuals(resid: &Array1<f64>) -> Self {
        let n = resid.len() as f64;
        let mean = resid.sum() / n;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for r in resid {
            let d = r - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        m2 /= n;
        m3 /= n;
        m4 /= n;
        Self {
            skew: m3 / m2.powf(1.5),
            kurtosis: m4 / (m2 * m2),
        }
    }
}
