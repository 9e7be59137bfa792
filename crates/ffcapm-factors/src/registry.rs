//! Factor Registry
//!
//! Central registry of the pricing factors and of the regressors each model
//! uses, so reports can label coefficients by name.

use serde::{Deserialize, Serialize};

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorCategory {
    /// Market excess return
    Market,
    /// Size spread (small minus big)
    Size,
    /// Value spread (high minus low book-to-market)
    Value,
}

/// Asset pricing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorModel {
    /// Single-factor CAPM
    Capm,
    /// Fama-French three-factor model
    FamaFrench3,
}

impl FactorModel {
    /// Short label used in file names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Capm => "CAPM",
            Self::FamaFrench3 => "FF3",
        }
    }
}

/// Factor metadata
#[derive(Debug, Clone)]
pub struct FactorInfo {
    /// Factor name (unique identifier, also the regressor label)
    pub name: &'static str,
    /// Factor category
    pub category: FactorCategory,
    /// Brief description of what the factor measures
    pub description: &'static str,
    /// Inputs the factor is built from
    pub required_inputs: &'static [&'static str],
    /// Models using the factor
    pub models: &'static [FactorModel],
}

/// Label of the intercept column.
pub const INTERCEPT: &str = "const";

/// Get all available factor info
pub fn available_factors() -> Vec<FactorInfo> {
    vec![
        FactorInfo {
            name: "MKT",
            category: FactorCategory::Market,
            description: "Exchange-count blended index return minus the weekly deposit rate",
            required_inputs: &["shanghai_index", "shenzhen_index", "risk_free_rate"],
            models: &[FactorModel::Capm, FactorModel::FamaFrench3],
        },
        FactorInfo {
            name: "SMB",
            category: FactorCategory::Size,
            description: "Average small-bucket return minus average big-bucket return",
            required_inputs: &["prices", "market_cap", "book_to_market"],
            models: &[FactorModel::FamaFrench3],
        },
        FactorInfo {
            name: "HML",
            category: FactorCategory::Value,
            description: "Average of SH and BH minus average of SL and BL",
            required_inputs: &["prices", "market_cap", "book_to_market"],
            models: &[FactorModel::FamaFrench3],
        },
    ]
}

/// Get factors by category
pub fn factors_by_category(category: FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.category == category)
        .collect()
}

/// Factors of one model, in regressor order
pub fn factors_for(model: FactorModel) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.models.contains(&model))
        .collect()
}

/// Get factor info by name
pub fn get_factor_info(name: &str) -> Option<FactorInfo> {
    available_factors().into_iter().find(|f| f.name == name)
}

/// Regressor labels of a model, intercept first
pub fn regressor_names(model: FactorModel) -> Vec<&'static str> {
    std::iter::once(INTERCEPT)
        .chain(factors_for(model).into_iter().map(|f| f.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_factors_count() {
        assert_eq!(available_factors().len(), 3);
    }

    #[test]
    fn test_factors_by_category() {
        assert_eq!(factors_by_category(FactorCategory::Market).len(), 1);
        assert_eq!(factors_by_category(FactorCategory::Size)[0].name, "SMB");
        assert_eq!(factors_by_category(FactorCategory::Value)[0].name, "HML");
    }

    #[test]
    fn test_get_factor_info() {
        let smb = get_factor_info("SMB").unwrap();
        assert_eq!(smb.category, FactorCategory::Size);
        assert!(smb.required_inputs.contains(&"market_cap"));
        assert!(get_factor_info("UMD").is_none());
    }

    #[test]
    fn test_regressor_names() {
        assert_eq!(regressor_names(FactorModel::Capm), vec!["const", "MKT"]);
        assert_eq!(
            regressor_names(FactorModel::FamaFrench3),
            vec!["const", "MKT", "SMB", "HML"]
        );
    }
}
