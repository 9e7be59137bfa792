//! Sample years and their week ranges.
//!
//! Portfolios are re-formed once a year at a year-end snapshot date and
//! held for the weeks of that calendar year.

use crate::error::{FactorError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

const END_2016: NaiveDate = NaiveDate::from_ymd_opt(2016, 12, 30).unwrap();
const END_2017: NaiveDate = NaiveDate::from_ymd_opt(2017, 12, 29).unwrap();
const END_2018: NaiveDate = NaiveDate::from_ymd_opt(2018, 12, 28).unwrap();

/// A year of the FF3 sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleYear {
    /// 2016
    #[serde(rename = "2016")]
    Y2016,
    /// 2017
    #[serde(rename = "2017")]
    Y2017,
    /// 2018
    #[serde(rename = "2018")]
    Y2018,
}

impl SampleYear {
    /// All sample years in chronological order.
    pub const ALL: [Self; 3] = [Self::Y2016, Self::Y2017, Self::Y2018];

    /// Calendar year.
    pub const fn year(self) -> i32 {
        match self {
            Self::Y2016 => 2016,
            Self::Y2017 => 2017,
            Self::Y2018 => 2018,
        }
    }

    /// Last trading Friday of the year, where the snapshots are read.
    pub const fn year_end(self) -> NaiveDate {
        match self {
            Self::Y2016 => END_2016,
            Self::Y2017 => END_2017,
            Self::Y2018 => END_2018,
        }
    }
}

impl fmt::Display for SampleYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year())
    }
}

/// Week ranges of each sample year within a return series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleCalendar {
    ranges: Vec<(SampleYear, Range<usize>)>,
}

impl SampleCalendar {
    /// Split a return series by the calendar year of each return date.
    ///
    /// Dates outside the sample years are ignored. Every sample year must
    /// own at least one week.
    ///
    /// # Errors
    ///
    /// Returns [`FactorError::EmptyYear`] when a year has no return dates.
    pub fn from_dates(dates: &[NaiveDate]) -> Result<Self> {
        let ranges = SampleYear::ALL
            .into_iter()
            .map(|year| {
                let start = dates.partition_point(|d| d.year() < year.year());
                let end = dates.partition_point(|d| d.year() <= year.year());
                if start == end {
                    Err(FactorError::EmptyYear(year))
                } else {
                    Ok((year, start..end))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    /// Use fixed week ranges, one per sample year in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is empty, overlaps its predecessor or ends past `len`.
    pub fn from_ranges(ranges: [Range<usize>; 3], len: usize) -> Result<Self> {
        let mut previous_end = 0;
        let mut out = Vec::with_capacity(3);
        for (year, range) in SampleYear::ALL.into_iter().zip(ranges) {
            if range.start >= range.end {
                return Err(FactorError::EmptyYear(year));
            }
            if range.start < previous_end || range.end > len {
                return Err(FactorError::WeekOutOfRange {
                    start: range.start,
                    end: range.end,
                    len,
                });
            }
            previous_end = range.end;
            out.push((year, range));
        }
        Ok(Self { ranges: out })
    }

    /// Years and ranges in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (SampleYear, Range<usize>)> + '_ {
        self.ranges.iter().cloned()
    }

    /// Total number of weeks covered.
    pub fn total_weeks(&self) -> usize {
        self.ranges.iter().map(|(_, r)| r.len()).sum()
    }
}
