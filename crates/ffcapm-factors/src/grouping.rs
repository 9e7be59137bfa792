//! Size and book-to-market portfolio grouping.
//!
//! Each year the universe is sorted by market value at the year-end date and
//! cut in half into Small and Big cohorts. Each cohort is then sorted by
//! book-to-market at the same date and cut into Low/High (four groups) or
//! Low/Medium/High (six groups) buckets.
//!
//! Cut positions are `round(pct * n)` with ties to even, and sorting is
//! stable, so equal values keep their prior order.

use crate::{
    calendar::SampleYear,
    error::{FactorError, Result},
};
use ffcapm_data::SnapshotTable;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Size side of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeCohort {
    /// Lower half by market value
    Small,
    /// Upper half by market value
    Big,
}

/// Book-to-market side of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueLevel {
    /// Lowest book-to-market
    Low,
    /// Middle third (six-group scheme only)
    Medium,
    /// Highest book-to-market
    High,
}

/// A size × value bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// Small, low book-to-market
    #[serde(rename = "SL")]
    SmallLow,
    /// Small, medium book-to-market
    #[serde(rename = "SM")]
    SmallMedium,
    /// Small, high book-to-market
    #[serde(rename = "SH")]
    SmallHigh,
    /// Big, low book-to-market
    #[serde(rename = "BL")]
    BigLow,
    /// Big, medium book-to-market
    #[serde(rename = "BM")]
    BigMedium,
    /// Big, high book-to-market
    #[serde(rename = "BH")]
    BigHigh,
}

impl Bucket {
    /// Bucket from its two sides.
    pub const fn new(size: SizeCohort, value: ValueLevel) -> Self {
        match (size, value) {
            (SizeCohort::Small, ValueLevel::Low) => Self::SmallLow,
            (SizeCohort::Small, ValueLevel::Medium) => Self::SmallMedium,
            (SizeCohort::Small, ValueLevel::High) => Self::SmallHigh,
            (SizeCohort::Big, ValueLevel::Low) => Self::BigLow,
            (SizeCohort::Big, ValueLevel::Medium) => Self::BigMedium,
            (SizeCohort::Big, ValueLevel::High) => Self::BigHigh,
        }
    }

    /// Size side.
    pub const fn size(self) -> SizeCohort {
        match self {
            Self::SmallLow | Self::SmallMedium | Self::SmallHigh => SizeCohort::Small,
            Self::BigLow | Self::BigMedium | Self::BigHigh => SizeCohort::Big,
        }
    }

    /// Value side.
    pub const fn value(self) -> ValueLevel {
        match self {
            Self::SmallLow | Self::BigLow => ValueLevel::Low,
            Self::SmallMedium | Self::BigMedium => ValueLevel::Medium,
            Self::SmallHigh | Self::BigHigh => ValueLevel::High,
        }
    }

    /// Two-letter code (`SL`, `BH`, ...).
    pub const fn code(self) -> &'static str {
        match self {
            Self::SmallLow => "SL",
            Self::SmallMedium => "SM",
            Self::SmallHigh => "SH",
            Self::BigLow => "BL",
            Self::BigMedium => "BM",
            Self::BigHigh => "BH",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Grouping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupScheme {
    /// SL / SH / BL / BH
    FourGroup,
    /// SL / SM / SH / BL / BM / BH
    SixGroup,
}

impl GroupScheme {
    /// Both schemes, in reporting order.
    pub const ALL: [Self; 2] = [Self::FourGroup, Self::SixGroup];

    /// Buckets of the scheme, in reporting order.
    pub const fn buckets(self) -> &'static [Bucket] {
        match self {
            Self::FourGroup => &[
                Bucket::SmallLow,
                Bucket::SmallHigh,
                Bucket::BigLow,
                Bucket::BigHigh,
            ],
            Self::SixGroup => &[
                Bucket::SmallLow,
                Bucket::SmallMedium,
                Bucket::SmallHigh,
                Bucket::BigLow,
                Bucket::BigMedium,
                Bucket::BigHigh,
            ],
        }
    }

    /// Value levels of the scheme, low to high.
    pub const fn value_levels(self) -> &'static [ValueLevel] {
        match self {
            Self::FourGroup => &[ValueLevel::Low, ValueLevel::High],
            Self::SixGroup => &[ValueLevel::Low, ValueLevel::Medium, ValueLevel::High],
        }
    }

    /// Interior book-to-market breakpoints as fractions of the cohort.
    pub const fn value_breakpoints(self) -> &'static [f64] {
        match self {
            Self::FourGroup => &[0.5],
            Self::SixGroup => &[0.33, 0.67],
        }
    }

    /// Short label used in report sections and file names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::FourGroup => "4_groups",
            Self::SixGroup => "6_groups",
        }
    }
}

impl fmt::Display for GroupScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Position of a percentile cut in a sorted list of `n` names.
///
/// Halves round to the even neighbour, so `percentile_index(0.5, 133)` is 66.
pub fn percentile_index(pct: f64, n: usize) -> usize {
    let cut = (pct * n as f64).round_ties_even();
    (cut.max(0.0) as usize).min(n)
}

/// Members of every bucket of one scheme in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAssignment {
    /// Sample year
    pub year: SampleYear,
    /// Scheme
    pub scheme: GroupScheme,
    members: BTreeMap<Bucket, Vec<String>>,
}

impl BucketAssignment {
    /// Members of one bucket, in book-to-market order.
    ///
    /// # Errors
    ///
    /// Returns [`FactorError::MissingBucket`] if the bucket is not part of the scheme.
    pub fn members(&self, bucket: Bucket) -> Result<&[String]> {
        self.members
            .get(&bucket)
            .map(Vec::as_slice)
            .ok_or(FactorError::MissingBucket(bucket))
    }

    /// Buckets and their members in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[String])> + '_ {
        self.scheme
            .buckets()
            .iter()
            .filter_map(|b| self.members.get(b).map(|m| (*b, m.as_slice())))
    }

    /// Number of assigned instruments.
    pub fn len(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    /// Whether nothing was assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size cohorts and both bucket schemes for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearGrouping {
    /// Sample year
    pub year: SampleYear,
    /// Small cohort, ascending by market value
    pub small: Vec<String>,
    /// Big cohort, ascending by market value
    pub big: Vec<String>,
    four: BucketAssignment,
    six: BucketAssignment,
}

impl YearGrouping {
    /// Assignment under one scheme.
    pub const fn scheme(&self, scheme: GroupScheme) -> &BucketAssignment {
        match scheme {
            GroupScheme::FourGroup => &self.four,
            GroupScheme::SixGroup => &self.six,
        }
    }
}

/// Group a universe for one year.
///
/// # Errors
///
/// Returns an error if the universe is empty or a snapshot value at the
/// year-end date is missing or not finite.
pub fn assign_buckets<S: AsRef<str>>(
    universe: &[S],
    market_cap: &SnapshotTable,
    book_to_market: &SnapshotTable,
    year: SampleYear,
) -> Result<YearGrouping> {
    if universe.is_empty() {
        return Err(FactorError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let date = year.year_end();
    let names: Vec<String> = universe.iter().map(|s| s.as_ref().to_string()).collect();

    let by_size = sort_by_snapshot(names, market_cap, date)?;
    let size_cut = percentile_index(0.5, by_size.len());
    let (small, big) = by_size.split_at(size_cut);
    let (small, big) = (small.to_vec(), big.to_vec());

    let small_by_value = sort_by_snapshot(small.clone(), book_to_market, date)?;
    let big_by_value = sort_by_snapshot(big.clone(), book_to_market, date)?;

    let assign = |scheme: GroupScheme| {
        let mut members = BTreeMap::new();
        for (size, sorted) in [
            (SizeCohort::Small, &small_by_value),
            (SizeCohort::Big, &big_by_value),
        ] {
            for (level, slice) in scheme
                .value_levels()
                .iter()
                .zip(split(sorted, scheme.value_breakpoints()))
            {
                members.insert(Bucket::new(size, *level), slice.to_vec());
            }
        }
        BucketAssignment {
            year,
            scheme,
            members,
        }
    };
    let four = assign(GroupScheme::FourGroup);
    let six = assign(GroupScheme::SixGroup);

    tracing::debug!(
        %year,
        small = small.len(),
        big = big.len(),
        "assigned size and value buckets"
    );
    Ok(YearGrouping {
        year,
        small,
        big,
        four,
        six,
    })
}

fn sort_by_snapshot(
    names: Vec<String>,
    snapshot: &SnapshotTable,
    date: chrono::NaiveDate,
) -> Result<Vec<String>> {
    let values = snapshot.values_at(&names, date)?;
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(FactorError::NonFiniteSnapshot {
            snapshot: snapshot.name().to_string(),
            instrument: names[pos].clone(),
        });
    }
    let mut keyed: Vec<(f64, String)> = values.into_iter().zip(names).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}

fn split<'a>(sorted: &'a [String], breakpoints: &[f64]) -> Vec<&'a [String]> {
    let n = sorted.len();
    let mut bounds = vec![0];
    bounds.extend(breakpoints.iter().map(|p| percentile_index(*p, n)));
    bounds.push(n);
    bounds.windows(2).map(|w| &sorted[w[0]..w[1]]).collect()
}
