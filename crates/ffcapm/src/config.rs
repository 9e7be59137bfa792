//! Study configuration.
//!
//! One JSON document describes where the workbooks live, how each study
//! derives its series and where results go. Every section has defaults, so
//! an empty object `{}` reads `data_CAPM.xlsx` and `data_FF3.xlsx` with their standard layout.

use crate::{capm::CapmConfig, error::Result, ff3::Ff3Config};
use ffcapm_data::{CapmLayout, Ff3Layout, load_json};
use ffcapm_output::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CAPM inputs and settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapmSection {
    /// Workbook layout.
    pub layout: CapmLayout,
    /// Derivation and regression settings.
    pub study: CapmConfig,
}

/// FF3 inputs and settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ff3Section {
    /// Workbook layout.
    pub layout: Ff3Layout,
    /// Derivation and regression settings.
    pub study: Ff3Config,
}

/// Where and how results are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory.
    pub dir: PathBuf,
    /// File format.
    pub format: ExportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            format: ExportFormat::Csv,
        }
    }
}

/// Complete study configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// CAPM section.
    pub capm: CapmSection,
    /// FF3 section.
    pub ff3: Ff3Section,
    /// Output section.
    pub output: OutputConfig,
}

impl StudyConfig {
    /// Read a configuration file. Relative workbook paths are resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = load_json(path)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        tracing::debug!(path = %path.display(), "loaded study configuration");
        Ok(config)
    }

    /// Resolve every relative input path against `base`.
    pub fn rebase(&mut self, base: &Path) {
        let capm = &mut self.capm.layout;
        capm.sheet.rebase(base);
        if let Some(source) = capm.market_cap.as_mut() {
            source.rebase(base);
        }

        let ff3 = &mut self.ff3.layout;
        for source in [
            &mut ff3.indices,
            &mut ff3.prices,
            &mut ff3.market_cap,
            &mut ff3.book_to_market,
        ] {
            source.rebase(base);
        }
    }
}
