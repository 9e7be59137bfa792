//! Year-end snapshot tables.
//!
//! Market value and book-to-market are not time series during a regression
//! window: they are read at one designated year-end date and used only to
//! sort and weight instruments. Sheets hold instruments in rows and
//! snapshot dates in columns.

use crate::{
    error::{DataError, Result},
    sheet::RawSheet,
};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Per-instrument scalars keyed by snapshot date.
#[derive(Debug, Clone)]
pub struct SnapshotTable {
    name: String,
    instruments: Vec<String>,
    rows: HashMap<String, usize>,
    dates: Vec<NaiveDate>,
    values: Vec<Vec<Option<f64>>>,
}

impl SnapshotTable {
    /// Build a snapshot table; `values[row][column]` matches `instruments` × `dates`.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate instruments or a ragged value grid.
    pub fn new(
        name: impl Into<String>,
        instruments: Vec<String>,
        dates: Vec<NaiveDate>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        let name = name.into();
        if instruments.len() != values.len() || values.iter().any(|r| r.len() != dates.len()) {
            return Err(DataError::Misaligned {
                left: name,
                right: "snapshot values".to_string(),
                reason: format!(
                    "expected {} rows of {} values",
                    instruments.len(),
                    dates.len()
                ),
            });
        }
        let mut rows = HashMap::with_capacity(instruments.len());
        for (pos, instrument) in instruments.iter().enumerate() {
            if rows.insert(instrument.clone(), pos).is_some() {
                return Err(DataError::DuplicateRow {
                    sheet: name,
                    row: instrument.clone(),
                });
            }
        }
        Ok(Self {
            name,
            instruments,
            rows,
            dates,
            values,
        })
    }

    /// Build from a raw sheet whose headers are dates.
    ///
    /// # Errors
    ///
    /// Returns an error if a header is not a date or a row label repeats.
    pub fn from_sheet(sheet: &RawSheet) -> Result<Self> {
        let dates = sheet.header_dates()?;
        let values = (0..sheet.height())
            .map(|row| {
                (0..dates.len())
                    .map(|col| sheet.cell(row, col).number())
                    .collect()
            })
            .collect();
        Self::new(sheet.name(), sheet.index().to_vec(), dates, values)
    }

    /// Table label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instruments in sheet order.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Snapshot dates in sheet order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Whether an instrument has a row.
    pub fn contains(&self, instrument: &str) -> bool {
        self.rows.contains_key(instrument)
    }

    /// Value of one instrument at one snapshot date.
    ///
    /// # Errors
    ///
    /// Returns an error if the instrument or date is unknown, or the cell is empty.
    pub fn value(&self, instrument: &str, date: NaiveDate) -> Result<f64> {
        let row = *self
            .rows
            .get(instrument)
            .ok_or_else(|| DataError::UnknownInstrument {
                snapshot: self.name.clone(),
                instrument: instrument.to_string(),
            })?;
        let col = self.date_column(date)?;
        self.values[row][col].ok_or_else(|| DataError::MissingValue {
            sheet: self.name.clone(),
            row: instrument.to_string(),
            column: date.to_string(),
        })
    }

    /// Values of several instruments at one date, in the given order.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown instrument or empty cell.
    pub fn values_at<S: AsRef<str>>(&self, instruments: &[S], date: NaiveDate) -> Result<Vec<f64>> {
        instruments
            .iter()
            .map(|name| self.value(name.as_ref(), date))
            .collect()
    }

    fn date_column(&self, date: NaiveDate) -> Result<usize> {
        self.dates
            .iter()
            .position(|d| *d == date)
            .ok_or_else(|| DataError::UnknownDate {
                snapshot: self.name.clone(),
                date: date.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn year_end(y: i32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, d).unwrap()
    }

    #[test]
    fn test_from_sheet_reads_dates_in_header() {
        let grid = vec![
            vec![
                Cell::Text("name".into()),
                Cell::Text("2016-12-30".into()),
                Cell::Text("2017-12-29".into()),
            ],
            vec![Cell::Text("A".into()), Cell::Number(10.0), Cell::Number(12.0)],
            vec![Cell::Text("B".into()), Cell::Number(20.0), Cell::Empty],
        ];
        let sheet = RawSheet::from_grid("cap".into(), grid, 0).unwrap();
        let table = SnapshotTable::from_sheet(&sheet).unwrap();

        assert_eq!(table.instruments(), ["A", "B"]);
        assert_eq!(table.value("A", year_end(2017, 29)).unwrap(), 12.0);
        assert_eq!(
            table.values_at(&["B", "A"], year_end(2016, 30)).unwrap(),
            vec![20.0, 10.0]
        );
        assert!(matches!(
            table.value("B", year_end(2017, 29)),
            Err(DataError::MissingValue { .. })
        ));
        assert!(matches!(
            table.value("C", year_end(2016, 30)),
            Err(DataError::UnknownInstrument { .. })
        ));
        assert!(matches!(
            table.value("A", year_end(2018, 28)),
            Err(DataError::UnknownDate { .. })
        ));
    }

    #[test]
    fn test_duplicate_instrument_rejected() {
        let err = SnapshotTable::new(
            "cap",
            vec!["A".into(), "A".into()],
            vec![year_end(2016, 30)],
            vec![vec![Some(1.0)], vec![Some(2.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DuplicateRow { .. }));
    }
}
