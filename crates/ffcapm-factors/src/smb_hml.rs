//! SMB and HML factor construction.
//!
//! Both factors are spreads of bucket returns:
//!
//! * SMB: average of the small buckets minus average of the big buckets
//!   (two per side with four groups, three per side with six groups).
//! * HML: average of SH and BH minus average of SL and BL, under either
//!   scheme. The medium buckets never enter HML.

use crate::{
    error::{FactorError, Result},
    grouping::{Bucket, GroupScheme},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weekly SMB and HML of one scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSeries {
    /// Scheme the buckets came from
    pub scheme: GroupScheme,
    smb: Vec<f64>,
    hml: Vec<f64>,
}

impl FactorSeries {
    /// Empty series to append yearly segments to.
    pub const fn empty(scheme: GroupScheme) -> Self {
        Self {
            scheme,
            smb: Vec::new(),
            hml: Vec::new(),
        }
    }

    /// Build one segment from per-bucket returns over the same weeks.
    ///
    /// # Errors
    ///
    /// Returns an error if a bucket of the scheme is missing or the bucket
    /// series differ in length.
    pub fn from_bucket_returns(
        bucket_returns: &BTreeMap<Bucket, Vec<f64>>,
        scheme: GroupScheme,
    ) -> Result<Self> {
        let get = |bucket: Bucket| {
            bucket_returns
                .get(&bucket)
                .map(Vec::as_slice)
                .ok_or(FactorError::MissingBucket(bucket))
        };
        let sl = get(Bucket::SmallLow)?;
        let sh = get(Bucket::SmallHigh)?;
        let bl = get(Bucket::BigLow)?;
        let bh = get(Bucket::BigHigh)?;
        let medium = match scheme {
            GroupScheme::FourGroup => None,
            GroupScheme::SixGroup => Some((get(Bucket::SmallMedium)?, get(Bucket::BigMedium)?)),
        };

        let weeks = sl.len();
        for (bucket, series) in [(Bucket::SmallHigh, sh), (Bucket::BigLow, bl), (Bucket::BigHigh, bh)]
            .into_iter()
            .chain(
                medium
                    .into_iter()
                    .flat_map(|(sm, bm)| [(Bucket::SmallMedium, sm), (Bucket::BigMedium, bm)]),
            )
        {
            if series.len() != weeks {
                return Err(FactorError::LengthMismatch {
                    what: format!("{bucket} returns"),
                    expected: weeks,
                    actual: series.len(),
                });
            }
        }

        let smb = (0..weeks)
            .map(|t| match medium {
                None => (sl[t] + sh[t]) / 2.0 - (bl[t] + bh[t]) / 2.0,
                Some((sm, bm)) => (sl[t] + sh[t] + sm[t]) / 3.0 - (bl[t] + bh[t] + bm[t]) / 3.0,
            })
            .collect();
        let hml = (0..weeks)
            .map(|t| (bh[t] + sh[t]) / 2.0 - (bl[t] + sl[t]) / 2.0)
            .collect();
        Ok(Self { scheme, smb, hml })
    }

    /// Append a later segment of the same scheme.
    pub fn append(&mut self, mut segment: Self) {
        debug_assert_eq!(self.scheme, segment.scheme);
        self.smb.append(&mut segment.smb);
        self.hml.append(&mut segment.hml);
    }

    /// Concatenate segments in the order given.
    pub fn concat(scheme: GroupScheme, segments: impl IntoIterator<Item = Self>) -> Self {
        segments
            .into_iter()
            .fold(Self::empty(scheme), |mut acc, segment| {
                acc.append(segment);
                acc
            })
    }

    /// Small-minus-big series.
    pub fn smb(&self) -> &[f64] {
        &self.smb
    }

    /// High-minus-low series.
    pub fn hml(&self) -> &[f64] {
        &self.hml
    }

    /// Number of weeks.
    pub fn len(&self) -> usize {
        self.smb.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.smb.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn buckets(scheme: GroupScheme, weeks: usize) -> BTreeMap<Bucket, Vec<f64>> {
        scheme
            .buckets()
            .iter()
            .map(|b| {
                let base = match b {
                    Bucket::SmallLow => 0.01,
                    Bucket::SmallMedium => 0.02,
                    Bucket::SmallHigh => 0.03,
                    Bucket::BigLow => 0.04,
                    Bucket::BigMedium => 0.05,
                    Bucket::BigHigh => 0.06,
                };
                (*b, (0..weeks).map(|t| base + t as f64 * 0.001).collect())
            })
            .collect()
    }

    #[test]
    fn test_four_group_formulas() {
        let f = FactorSeries::from_bucket_returns(&buckets(GroupScheme::FourGroup, 2), GroupScheme::FourGroup)
            .unwrap();
        assert_relative_eq!(f.smb()[0], (0.01 + 0.03) / 2.0 - (0.04 + 0.06) / 2.0, epsilon = 1e-15);
        assert_relative_eq!(f.hml()[1], (0.061 + 0.031) / 2.0 - (0.041 + 0.011) / 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_six_group_smb_uses_three_buckets_per_side() {
        let f = FactorSeries::from_bucket_returns(&buckets(GroupScheme::SixGroup, 1), GroupScheme::SixGroup)
            .unwrap();
        assert_relative_eq!(
            f.smb()[0],
            (0.01 + 0.03 + 0.02) / 3.0 - (0.04 + 0.06 + 0.05) / 3.0,
            epsilon = 1e-15
        );
    }

    #[rstest]
    #[case(GroupScheme::FourGroup)]
    #[case(GroupScheme::SixGroup)]
    fn test_hml_ignores_medium_buckets(#[case] scheme: GroupScheme) {
        let mut returns = buckets(GroupScheme::SixGroup, 1);
        let base = FactorSeries::from_bucket_returns(&returns, scheme).unwrap();
        returns.insert(Bucket::SmallMedium, vec![9.0]);
        returns.insert(Bucket::BigMedium, vec![-9.0]);
        let shifted = FactorSeries::from_bucket_returns(&returns, scheme).unwrap();
        assert_eq!(base.hml(), shifted.hml());
    }

    #[test]
    fn test_missing_bucket_is_reported() {
        let returns = buckets(GroupScheme::FourGroup, 3);
        let err = FactorSeries::from_bucket_returns(&returns, GroupScheme::SixGroup).unwrap_err();
        assert!(matches!(err, FactorError::MissingBucket(Bucket::SmallMedium)));
    }

    #[test]
    fn test_concat_preserves_year_order() {
        let segments = [49, 51, 51].map(|weeks| {
            FactorSeries::from_bucket_returns(&buckets(GroupScheme::FourGroup, weeks), GroupScheme::FourGroup)
                .unwrap()
        });
        let full = FactorSeries::concat(GroupScheme::FourGroup, segments);
        assert_eq!(full.len(), 151);
        // each segment restarts its week offset
        assert_relative_eq!(full.hml()[49], full.hml()[0], epsilon = 1e-15);
    }
}
