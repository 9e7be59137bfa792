//! Sectioned result files.
//!
//! A report is a sequence of labelled sections written into one file in the
//! order they were added. In CSV form each section is its label, a blank
//! line, the body and three blank lines; in JSON form the sections become
//! an array of `{label, content}` objects.

use crate::export::{ExportError, ExportFormat, Exporter};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Timestamp layout used in result file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H@%M@%S";

/// Build `<dir>/<prefix><timestamp>.<extension>`.
pub fn timestamped_path(
    dir: &Path,
    prefix: &str,
    at: NaiveDateTime,
    format: ExportFormat,
) -> PathBuf {
    dir.join(format!(
        "{prefix}{}.{}",
        at.format(TIMESTAMP_FORMAT),
        format.extension()
    ))
}

/// Current local time, for [`timestamped_path`].
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Serialize)]
struct JsonSection<'a> {
    label: &'a str,
    content: serde_json::Value,
}

/// One labelled section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section label.
    pub label: String,
    /// Rendered body in the report's format.
    pub body: String,
}

/// Ordered collection of sections sharing one format.
#[derive(Debug, Clone)]
pub struct SectionedReport {
    format: ExportFormat,
    sections: Vec<Section>,
}

impl SectionedReport {
    /// Create an empty report.
    pub const fn new(format: ExportFormat) -> Self {
        Self {
            format,
            sections: Vec::new(),
        }
    }

    /// Output format.
    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    /// Render `item` in the report format and append it as a section.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn push<E: Exporter + ?Sized>(
        &mut self,
        label: impl Into<String>,
        item: &E,
    ) -> Result<&mut Self, ExportError> {
        let body = item.export_to_string(self.format)?;
        self.sections.push(Section {
            label: label.into(),
            body,
        });
        Ok(self)
    }

    /// Sections in insertion order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.label.as_str())
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the report has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Write every section to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or a JSON body cannot be re-read.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ExportError> {
        if self.format.is_json() {
            let sections = self
                .sections
                .iter()
                .map(|s| {
                    Ok(JsonSection {
                        label: &s.label,
                        content: serde_json::from_str(&s.body)?,
                    })
                })
                .collect::<Result<Vec<_>, ExportError>>()?;
            if self.format == ExportFormat::PrettyJson {
                serde_json::to_writer_pretty(&mut *writer, &sections)?;
            } else {
                serde_json::to_writer(&mut *writer, &sections)?;
            }
            writeln!(writer)?;
        } else {
            for section in &self.sections {
                write!(writer, "{}\n\n{}\n\n\n\n", section.label, section.body)?;
            }
        }
        Ok(())
    }

    /// Write the report to a new file, flushing before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), sections = self.len(), "wrote report");
        Ok(())
    }
}
