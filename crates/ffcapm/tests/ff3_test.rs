//! End-to-end FF3 runs on a synthetic three-year panel.

use chrono::NaiveDate;
use ffcapm::{Ff3Config, Ff3Study};
use ffcapm_data::{Exchange, Ff3Dataset, Instrument, MarketSeries, PriceTable, SnapshotTable};
use ffcapm_factors::{GroupScheme, SampleYear};
use ffcapm_output::ExportFormat;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

const STOCKS: usize = 12;

fn names() -> Vec<String> {
    (0..STOCKS)
        .map(|j| {
            if j < 7 {
                format!("6000{j:02}.SH")
            } else {
                format!("0000{j:02}.SZ")
            }
        })
        .collect()
}

/// Fridays from 2016-01-01 to 2018-12-28.
fn dates() -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
    (0..=156)
        .map(|t| start + chrono::Duration::weeks(t))
        .collect()
}

fn random_walk(rng: &mut StdRng, start: f64, len: usize) -> Vec<f64> {
    let mut level = start;
    let mut out = Vec::with_capacity(len);
    for t in 0..len {
        if t > 0 {
            level *= 1.0 + rng.gen_range(-0.06..0.06);
        }
        out.push(level);
    }
    out
}

fn snapshot(name: &str, rng: &mut StdRng) -> SnapshotTable {
    SnapshotTable::new(
        name,
        names(),
        SampleYear::ALL.iter().map(|y| y.year_end()).collect(),
        (0..STOCKS)
            .map(|_| {
                SampleYear::ALL
                    .iter()
                    .map(|_| Some(rng.gen_range(0.1..100.0)))
                    .collect()
            })
            .collect(),
    )
    .unwrap()
}

fn dataset(seed: u64) -> Ff3Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let dates = dates();
    let n = dates.len();
    let rates = (0..n).map(|_| rng.gen_range(1.1..1.6)).collect();
    let market = MarketSeries::new(
        dates.clone(),
        rates,
        random_walk(&mut rng, 3000.0, n),
        random_walk(&mut rng, 10000.0, n),
    )
    .unwrap();
    let columns = names()
        .into_iter()
        .map(|name| {
            let exchange = Exchange::from_ticker(&name).unwrap();
            let start = rng.gen_range(5.0..50.0);
            let levels = random_walk(&mut rng, start, n);
            (Instrument::new(name, exchange), levels)
        })
        .collect();
    let prices = PriceTable::new("close", dates, columns).unwrap();
    let market_cap = snapshot("market_cap", &mut rng);
    let book_to_market = snapshot("book_to_market", &mut rng);
    Ff3Dataset::new(market, prices, market_cap, book_to_market).unwrap()
}

#[test]
fn test_calendar_follows_return_dates() {
    let data = dataset(11);
    let study = Ff3Study::new(&data, Ff3Config::default()).unwrap();
    let calendar = study.calendar();
    let ranges: Vec<_> = calendar.iter().collect();
    assert_eq!(
        ranges,
        vec![
            (SampleYear::Y2016, 0..52),
            (SampleYear::Y2017, 52..104),
            (SampleYear::Y2018, 104..156),
        ]
    );
    assert_eq!(study.sample_dates().len(), 156);
}

#[test]
fn test_partitions_are_exhaustive_and_disjoint() {
    let data = dataset(23);
    let study = Ff3Study::new(&data, Ff3Config::default()).unwrap();
    let universe: HashSet<String> = names().into_iter().collect();

    for grouping in study.groupings() {
        assert_eq!(grouping.small.len() + grouping.big.len(), STOCKS);
        for scheme in GroupScheme::ALL {
            let assignment = grouping.scheme(scheme);
            let mut seen = HashSet::new();
            for (_, members) in assignment.iter() {
                for member in members {
                    assert!(seen.insert(member.clone()), "{member} assigned twice");
                }
            }
            assert_eq!(seen, universe);
        }
    }
}

#[test]
fn test_factor_length_is_sum_of_year_weeks() {
    let data = dataset(5);
    let config = Ff3Config {
        week_ranges: Some([0..49, 49..100, 100..151]),
        ..Ff3Config::default()
    };
    let study = Ff3Study::new(&data, config).unwrap();
    for scheme in GroupScheme::ALL {
        let series = study.scheme_series(scheme).unwrap();
        assert_eq!(series.factors.len(), 49 + 51 + 51);
        assert_eq!(series.factors.smb().len(), series.factors.hml().len());
        for bucket in &series.buckets {
            assert_eq!(bucket.portfolio.len(), 151);
            assert_eq!(bucket.market.len(), 151);
        }
    }
}

#[test]
fn test_full_run_writes_all_outputs() {
    let data = dataset(42);
    let results = Ff3Study::new(&data, Ff3Config::default())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(results.summaries.len(), 10);
    assert!(results.summaries.iter().all(|s| s.nobs == 156));
    for portfolio in &results.holdings {
        assert!((portfolio.total_weight() - 1.0).abs() < 1e-12);
    }

    let dir = std::env::temp_dir().join(format!("ffcapm_ff3_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let at = NaiveDate::from_ymd_opt(2019, 11, 23)
        .unwrap()
        .and_hms_opt(11, 25, 0)
        .unwrap();
    let outputs = results.write(&dir, ExportFormat::Json, at).unwrap();
    assert!(outputs.results.ends_with("FF3_results2019-11-23 11@25@00.json"));

    let sections: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outputs.results).unwrap()).unwrap();
    assert_eq!(sections[0]["label"], "name_4_groups_SL");
    assert_eq!(sections[9]["label"], "name_6_groups_BH");
    assert_eq!(sections[0]["content"]["coefficients"][3]["name"], "HML");

    let factors: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outputs.factors).unwrap()).unwrap();
    assert_eq!(factors.as_array().unwrap().len(), 2 * 156);
    std::fs::remove_dir_all(dir).ok();
}
