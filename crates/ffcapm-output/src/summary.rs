//! Regression summaries.
//!
//! A [`RegressionSummary`] is the printable form of a fitted OLS model: the
//! header statistics, one coefficient row per regressor and the residual
//! diagnostics. It renders as a delimited block (the layout of a classical
//! OLS summary exported as CSV), as an ASCII table or as JSON.

use crate::export::{ExportError, ExportFormat, Exporter, csv_to_string};
use ffcapm_regression::OlsResults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One coefficient line of a summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoefficientRow {
    /// Regressor label.
    pub name: String,

    /// Estimate.
    pub coef: f64,

    /// Standard error.
    pub std_err: f64,

    /// t statistic.
    pub t: f64,

    /// Two-sided p-value.
    pub p_value: f64,

    /// Lower confidence bound.
    pub ci_lower: f64,

    /// Upper confidence bound.
    pub ci_upper: f64,
}

/// Printable OLS summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionSummary {
    /// Section title, e.g. `port_sh_sz` or `name_4_groups_SL`.
    pub title: String,

    /// Name of the dependent variable.
    pub dep_variable: String,

    /// Number of observations.
    pub nobs: usize,

    /// Residual degrees of freedom.
    pub df_resid: usize,

    /// Model degrees of freedom.
    pub df_model: usize,

    /// R².
    pub rsquared: f64,

    /// Adjusted R².
    pub rsquared_adj: f64,

    /// F statistic.
    pub fvalue: f64,

    /// p-value of the F statistic.
    pub f_pvalue: f64,

    /// Log-likelihood.
    pub llf: f64,

    /// Akaike information criterion.
    pub aic: f64,

    /// Bayesian information criterion.
    pub bic: f64,

    /// Confidence level of the coefficient intervals.
    pub confidence_level: f64,

    /// Coefficient rows, intercept first.
    pub coefficients: Vec<CoefficientRow>,

    /// Durbin-Watson statistic.
    pub durbin_watson: f64,

    /// Jarque-Bera statistic.
    pub jarque_bera: f64,

    /// p-value of the Jarque-Bera statistic.
    pub jb_pvalue: f64,

    /// Residual skewness.
    pub skew: f64,

    /// Residual kurtosis.
    pub kurtosis: f64,
}

impl RegressionSummary {
    /// Build a summary from a fitted model.
    ///
    /// # Arguments
    ///
    /// * `title` - Section title
    /// * `dep_variable` - Name of the dependent variable
    /// * `regressors` - One label per coefficient, intercept first
    /// * `results` - Fitted model
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidFormat`] if the label count differs from
    /// the coefficient count.
    pub fn from_results(
        title: impl Into<String>,
        dep_variable: impl Into<String>,
        regressors: &[&str],
        results: &OlsResults,
    ) -> Result<Self, ExportError> {
        if regressors.len() != results.num_params() {
            return Err(ExportError::InvalidFormat(format!(
                "{} regressor labels for {} coefficients",
                regressors.len(),
                results.num_params()
            )));
        }
        let coefficients = regressors
            .iter()
            .enumerate()
            .map(|(i, name)| CoefficientRow {
                name: (*name).to_string(),
                coef: results.params[i],
                std_err: results.bse[i],
                t: results.tvalues[i],
                p_value: results.pvalues[i],
                ci_lower: results.conf_int[[i, 0]],
                ci_upper: results.conf_int[[i, 1]],
            })
            .collect();
        Ok(Self {
            title: title.into(),
            dep_variable: dep_variable.into(),
            nobs: results.nobs,
            df_resid: results.df_resid,
            df_model: results.df_model,
            rsquared: results.rsquared,
            rsquared_adj: results.rsquared_adj,
            fvalue: results.fvalue,
            f_pvalue: results.f_pvalue,
            llf: results.llf,
            aic: results.aic,
            bic: results.bic,
            confidence_level: results.confidence_level,
            coefficients,
            durbin_watson: results.durbin_watson,
            jarque_bera: results.jarque_bera,
            jb_pvalue: results.jb_pvalue,
            skew: results.skew,
            kurtosis: results.kurtosis,
        })
    }

    /// Coefficient row by label.
    pub fn coefficient(&self, name: &str) -> Option<&CoefficientRow> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    fn interval_labels(&self) -> (String, String) {
        let alpha = 1.0 - self.confidence_level;
        (
            format!("[{:.3}", alpha / 2.0),
            format!("{:.3}]", 1.0 - alpha / 2.0),
        )
    }

    /// Render as a delimited block.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(vec![]);

        wtr.write_record(["OLS Regression Results"])?;
        let header = [
            ("Dep. Variable:", self.dep_variable.clone(), "R-squared:", fmt3(self.rsquared)),
            ("Model:", "OLS".to_string(), "Adj. R-squared:", fmt3(self.rsquared_adj)),
            ("Method:", "Least Squares".to_string(), "F-statistic:", fmt3(self.fvalue)),
            ("No. Observations:", self.nobs.to_string(), "Prob (F-statistic):", fmt_p(self.f_pvalue)),
            ("Df Residuals:", self.df_resid.to_string(), "Log-Likelihood:", format!("{:.4}", self.llf)),
            ("Df Model:", self.df_model.to_string(), "AIC:", fmt3(self.aic)),
            ("Covariance Type:", "nonrobust".to_string(), "BIC:", fmt3(self.bic)),
        ];
        for (l1, v1, l2, v2) in header {
            wtr.write_record([l1, v1.as_str(), l2, v2.as_str()])?;
        }

        let (lo, hi) = self.interval_labels();
        wtr.write_record(["", "coef", "std err", "t", "P>|t|", lo.as_str(), hi.as_str()])?;
        for c in &self.coefficients {
            wtr.write_record([
                c.name.clone(),
                format!("{:.4}", c.coef),
                format!("{:.4}", c.std_err),
                format!("{:.3}", c.t),
                format!("{:.3}", c.p_value),
                format!("{:.4}", c.ci_lower),
                format!("{:.4}", c.ci_upper),
            ])?;
        }

        wtr.write_record([
            "Durbin-Watson:".to_string(),
            fmt3(self.durbin_watson),
            "Jarque-Bera (JB):".to_string(),
            fmt3(self.jarque_bera),
        ])?;
        wtr.write_record([
            "Skew:".to_string(),
            fmt3(self.skew),
            "Prob(JB):".to_string(),
            fmt_p(self.jb_pvalue),
        ])?;
        wtr.write_record(["Kurtosis:".to_string(), fmt3(self.kurtosis)])?;

        csv_to_string(wtr)
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", self.title));
        output.push_str(&"=".repeat(78));
        output.push('\n');
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "Dep. Variable:",
            self.dep_variable,
            "R-squared:",
            fmt3(self.rsquared)
        ));
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "No. Observations:",
            self.nobs,
            "Adj. R-squared:",
            fmt3(self.rsquared_adj)
        ));
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "Df Residuals:",
            self.df_resid,
            "F-statistic:",
            fmt3(self.fvalue)
        ));
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "Df Model:",
            self.df_model,
            "Prob (F-statistic):",
            fmt_p(self.f_pvalue)
        ));
        output.push_str(&"-".repeat(78));
        output.push('\n');

        let (lo, hi) = self.interval_labels();
        output.push_str(&format!(
            "{:<10}{:>11}{:>11}{:>10}{:>10}{:>13}{:>13}\n",
            "", "coef", "std err", "t", "P>|t|", lo, hi
        ));
        for c in &self.coefficients {
            output.push_str(&format!(
                "{:<10}{:>11.4}{:>11.4}{:>10.3}{:>10.3}{:>13.4}{:>13.4}\n",
                c.name, c.coef, c.std_err, c.t, c.p_value, c.ci_lower, c.ci_upper
            ));
        }
        output.push_str(&"-".repeat(78));
        output.push('\n');
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "Durbin-Watson:",
            fmt3(self.durbin_watson),
            "Jarque-Bera (JB):",
            fmt3(self.jarque_bera)
        ));
        output.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17}\n",
            "Skew:",
            fmt3(self.skew),
            "Kurtosis:",
            fmt3(self.kurtosis)
        ));
        output.push_str(&"=".repeat(78));
        output.push('\n');

        output
    }
}

fn fmt3(value: f64) -> String {
    format!("{value:.3}")
}

fn fmt_p(value: f64) -> String {
    if value.is_finite() && value != 0.0 && value.abs() < 1e-3 {
        format!("{value:.2e}")
    } else {
        format!("{value:.3}")
    }
}

impl fmt::Display for RegressionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (n = {})", self.title, self.nobs)?;
        for c in &self.coefficients {
            writeln!(f, "  {}: {:.4} (p = {:.3})", c.name, c.coef, c.p_value)?;
        }
        writeln!(f, "  R-squared: {:.3}", self.rsquared)?;
        Ok(())
    }
}

impl Exporter for RegressionSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
