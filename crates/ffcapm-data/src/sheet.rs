//! Raw sheet reading for workbooks and CSV files.
//!
//! A [`RawSheet`] is the untyped grid behind every table of the study: a
//! header row, one label per data row taken from the index column, and the
//! remaining cells. Typed tables ([`crate::PriceTable`],
//! [`crate::SnapshotTable`]) are built from it and do all validation.

use crate::{
    config::{ColumnRange, ColumnRef, SheetSource},
    error::{DataError, Result},
};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use chrono::NaiveDate;
use std::{collections::HashSet, ops::Range, path::Path};

/// Accepted textual date formats, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y-%m-%d %H:%M:%S", "%Y%m%d"];

/// A single cell reduced to what the study needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank or unusable cell.
    Empty,
    /// Numeric cell.
    Number(f64),
    /// Text cell; dates are normalised to `YYYY-MM-DD`.
    Text(String),
}

impl Cell {
    fn from_excel(data: &Data) -> Self {
        match data {
            Data::Int(v) => Self::Number(*v as f64),
            Data::Float(v) => Self::Number(*v),
            Data::String(s) | Data::DateTimeIso(s) => Self::text(s),
            Data::DateTime(_) => data
                .as_date()
                .map_or(Self::Empty, |d| Self::Text(d.format("%Y-%m-%d").to_string())),
            Data::Bool(_) | Data::DurationIso(_) | Data::Error(_) | Data::Empty => Self::Empty,
        }
    }

    fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Cell as a label (header or index).
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            Self::Number(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Cell as a number; text cells are parsed.
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.replace(',', "").parse().ok(),
        }
    }
}

/// Parse a label as a calendar date.
pub fn parse_date(label: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(label, fmt).ok())
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Untyped contents of one sheet.
#[derive(Debug, Clone)]
pub struct RawSheet {
    name: String,
    headers: Vec<String>,
    index: Vec<String>,
    cells: Vec<Vec<Cell>>,
}

impl RawSheet {
    /// Read a sheet from a workbook or CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the sheet is missing or
    /// empty, a header is duplicated, or a data row has no index label.
    pub fn read(source: &SheetSource) -> Result<Self> {
        let extension = source
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let grid = match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(source)?,
            "csv" => read_csv(&source.path)?,
            _ => {
                return Err(DataError::UnsupportedFormat(
                    source.path.display().to_string(),
                ));
            }
        };
        tracing::debug!(sheet = %source.label(), rows = grid.len(), "read sheet");
        Self::from_grid(source.label(), grid, source.index_column)
    }

    /// Build a sheet from a grid whose first row is the header.
    ///
    /// # Errors
    ///
    /// See [`RawSheet::read`].
    pub fn from_grid(name: String, grid: Vec<Vec<Cell>>, index_column: usize) -> Result<Self> {
        let mut rows = grid.into_iter();
        let header = rows.next().ok_or_else(|| DataError::EmptySheet(name.clone()))?;
        if index_column >= header.len() {
            return Err(DataError::ColumnNotFound {
                sheet: name,
                column: format!("#{index_column} (index)"),
            });
        }

        let mut headers = Vec::with_capacity(header.len() - 1);
        let mut seen = HashSet::new();
        for (pos, cell) in header.iter().enumerate() {
            if pos == index_column {
                continue;
            }
            let label = cell.label().unwrap_or_else(|| format!("Unnamed: {pos}"));
            if !seen.insert(label.clone()) {
                return Err(DataError::DuplicateColumn {
                    sheet: name,
                    column: label,
                });
            }
            headers.push(label);
        }

        let mut index = Vec::new();
        let mut cells = Vec::new();
        for (row_no, row) in rows.enumerate() {
            if row.iter().all(|c| *c == Cell::Empty) {
                continue;
            }
            let label = row
                .get(index_column)
                .and_then(Cell::label)
                .ok_or_else(|| DataError::MissingValue {
                    sheet: name.clone(),
                    row: format!("#{}", row_no + 2),
                    column: "index".to_string(),
                })?;
            let mut values: Vec<Cell> = row
                .into_iter()
                .enumerate()
                .filter(|(pos, _)| *pos != index_column)
                .map(|(_, cell)| cell)
                .collect();
            values.resize(headers.len(), Cell::Empty);
            index.push(label);
            cells.push(values);
        }

        if index.is_empty() {
            return Err(DataError::EmptySheet(name));
        }

        Ok(Self {
            name,
            headers,
            index,
            cells,
        })
    }

    /// Sheet label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data-column headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Row labels from the index column.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Position of a referenced column.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnNotFound`] when the reference does not resolve.
    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        let found = match column {
            ColumnRef::Position(p) => (*p < self.headers.len()).then_some(*p),
            ColumnRef::Name(n) => self.headers.iter().position(|h| h == n),
        };
        found.ok_or_else(|| DataError::ColumnNotFound {
            sheet: self.name.clone(),
            column: column.to_string(),
        })
    }

    /// Positions covered by a column range.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnNotFound`] when the range exceeds the sheet.
    pub fn select(&self, range: &ColumnRange) -> Result<Range<usize>> {
        range
            .resolve(self.headers.len())
            .ok_or_else(|| DataError::ColumnNotFound {
                sheet: self.name.clone(),
                column: format!("{}..{:?}", range.start, range.end),
            })
    }

    /// Cell at a data row and column.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.cells[row][column]
    }

    /// A fully populated numeric column.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingValue`] on the first empty or non-numeric cell.
    pub fn numeric_column(&self, column: usize) -> Result<Vec<f64>> {
        self.cells
            .iter()
            .zip(&self.index)
            .map(|(row, label)| {
                row[column].number().ok_or_else(|| DataError::MissingValue {
                    sheet: self.name.clone(),
                    row: label.clone(),
                    column: self.headers[column].clone(),
                })
            })
            .collect()
    }

    /// Row labels parsed as strictly increasing dates.
    ///
    /// # Errors
    ///
    /// Returns an error if a label is not a date or the dates are out of order.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let dates = parse_labels(&self.name, &self.index)?;
        ensure_increasing(&self.name, &dates)?;
        Ok(dates)
    }

    /// Column headers parsed as dates (snapshot sheets).
    ///
    /// # Errors
    ///
    /// Returns an error if a header is not a date.
    pub fn header_dates(&self) -> Result<Vec<NaiveDate>> {
        parse_labels(&self.name, &self.headers)
    }
}

fn parse_labels(sheet: &str, labels: &[String]) -> Result<Vec<NaiveDate>> {
    labels
        .iter()
        .map(|label| {
            parse_date(label).ok_or_else(|| DataError::UnparseableDate {
                sheet: sheet.to_string(),
                value: label.clone(),
            })
        })
        .collect()
}

fn ensure_increasing(sheet: &str, dates: &[NaiveDate]) -> Result<()> {
    match dates.windows(2).find(|w| w[1] <= w[0]) {
        Some(w) => Err(DataError::UnorderedDates {
            sheet: sheet.to_string(),
            date: w[1].to_string(),
        }),
        None => Ok(()),
    }
}

fn read_workbook(source: &SheetSource) -> Result<Vec<Vec<Cell>>> {
    let mut workbook =
        open_workbook_auto(&source.path).map_err(|e| DataError::workbook(&source.path, e))?;
    let names = workbook.sheet_names();
    let sheet = match &source.sheet {
        Some(sheet) if names.contains(sheet) => sheet.clone(),
        Some(sheet) => {
            return Err(DataError::SheetNotFound {
                path: source.path.display().to_string(),
                sheet: sheet.clone(),
            });
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| DataError::EmptySheet(source.label()))?,
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| DataError::workbook(&source.path, e))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from_excel).collect())
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut grid = Vec::new();
    for record in reader.records() {
        grid.push(record?.iter().map(Cell::text).collect());
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::text(s)
    }

    fn grid() -> Vec<Vec<Cell>> {
        vec![
            vec![text("date"), text("rate"), text("600048.SH")],
            vec![text("2016-01-08"), Cell::Number(1.1), Cell::Number(9.5)],
            vec![text("2016-01-15"), Cell::Number(1.1), text("9.7")],
        ]
    }

    #[test]
    fn test_from_grid_splits_index() {
        let sheet = RawSheet::from_grid("s".to_string(), grid(), 0).unwrap();
        assert_eq!(sheet.headers(), ["rate", "600048.SH"]);
        assert_eq!(sheet.index(), ["2016-01-08", "2016-01-15"]);
        assert_eq!(sheet.numeric_column(1).unwrap(), vec![9.5, 9.7]);
        assert_eq!(sheet.dates().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let mut g = grid();
        g[0][2] = text("rate");
        let err = RawSheet::from_grid("s".to_string(), g, 0).unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_missing_value_reported() {
        let mut g = grid();
        g[2][1] = Cell::Empty;
        let sheet = RawSheet::from_grid("s".to_string(), g, 0).unwrap();
        assert!(matches!(
            sheet.numeric_column(0),
            Err(DataError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_unordered_dates_rejected() {
        let mut g = grid();
        g[2][0] = text("2016-01-01");
        let sheet = RawSheet::from_grid("s".to_string(), g, 0).unwrap();
        assert!(matches!(
            sheet.dates(),
            Err(DataError::UnorderedDates { .. })
        ));
    }

    #[test]
    fn test_resolve_by_name_and_position() {
        let sheet = RawSheet::from_grid("s".to_string(), grid(), 0).unwrap();
        assert_eq!(sheet.resolve(&ColumnRef::Name("600048.SH".into())).unwrap(), 1);
        assert_eq!(sheet.resolve(&ColumnRef::Position(0)).unwrap(), 0);
        assert!(sheet.resolve(&ColumnRef::Position(5)).is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2016, 12, 30).unwrap();
        assert_eq!(parse_date("2016-12-30"), Some(expected));
        assert_eq!(parse_date("2016/12/30"), Some(expected));
        assert_eq!(parse_date("2016-12-30 00:00:00"), Some(expected));
        assert_eq!(parse_date("20161230"), Some(expected));
        assert_eq!(parse_date("week 1"), None);
    }

    #[test]
    fn test_integral_number_label() {
        assert_eq!(Cell::Number(600048.0).label().as_deref(), Some("600048"));
    }
}
