//! Integration tests for regression summaries and sectioned result files.

use chrono::NaiveDate;
use ffcapm_output::{
    ExportFormat, Exporter, FactorSeriesRow, PortfolioExport, PortfolioHolding,
    RegressionSummary, SectionedReport, StockRegressionRow, StockRegressionTable,
    timestamped_path,
};
use ffcapm_regression::{LinearEstimator, OrdinaryLeastSquares, design_matrix};
use ndarray::Array1;

fn three_factor_summary(title: &str) -> RegressionSummary {
    let mkt = [0.010, -0.020, 0.015, 0.003, -0.008, 0.022, -0.011, 0.004, 0.009, -0.017];
    let smb = [0.002, 0.001, -0.004, 0.006, -0.002, 0.000, 0.003, -0.005, 0.001, 0.004];
    let hml = [-0.001, 0.003, 0.002, -0.002, 0.005, -0.004, 0.000, 0.001, -0.003, 0.002];
    let noise = [0.0004, -0.0003, 0.0001, -0.0002, 0.0005, -0.0001, 0.0002, -0.0004, 0.0003, -0.0005];
    let y: Array1<f64> = (0..mkt.len())
        .map(|i| 0.001 + 1.1 * mkt[i] + 0.5 * smb[i] - 0.3 * hml[i] + noise[i])
        .collect();
    let x = design_matrix(&[&mkt[..], &smb[..], &hml[..]]).unwrap();
    let fit = OrdinaryLeastSquares::default().fit(&y, &x).unwrap();
    RegressionSummary::from_results(title, "y", &["const", "MKT", "SMB", "HML"], &fit).unwrap()
}

#[test]
fn test_three_factor_summary_round_trip() {
    let summary = three_factor_summary("name_4_groups_SL");
    assert_eq!(summary.nobs, 10);
    assert_eq!(summary.df_model, 3);
    assert_eq!(summary.df_resid, 6);
    assert!((summary.coefficient("MKT").unwrap().coef - 1.1).abs() < 0.05);
    assert!(summary.rsquared > 0.99);

    let csv = summary.export_to_string(ExportFormat::Csv).unwrap();
    let order: Vec<usize> = ["\nconst,", "\nMKT,", "\nSMB,", "\nHML,"]
        .iter()
        .map(|label| csv.find(label).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    let json = summary.export_to_string(ExportFormat::Json).unwrap();
    let parsed: RegressionSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.coefficients.len(), 4);
    assert_eq!(parsed.title, "name_4_groups_SL");
}

#[test]
fn test_report_file_with_mixed_sections() {
    let mut report = SectionedReport::new(ExportFormat::Csv);
    report
        .push("name_4_groups_SL", &three_factor_summary("name_4_groups_SL"))
        .unwrap()
        .push("name_4_groups_SH", &three_factor_summary("name_4_groups_SH"))
        .unwrap();
    report
        .push(
            "sh_sz",
            &StockRegressionTable::new(
                "sh_sz".to_string(),
                vec![StockRegressionRow::new("000002.SZ".to_string(), 1.0, 0.4, 0.002)],
            ),
        )
        .unwrap();
    assert_eq!(report.len(), 3);

    let dir = std::env::temp_dir().join(format!("ffcapm_output_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let at = NaiveDate::from_ymd_opt(2019, 11, 23)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let path = timestamped_path(&dir, "FF3_results", at, report.format());
    assert!(path.ends_with("FF3_results2019-11-23 09@30@00.csv"));

    report.write_file(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("name_4_groups_SL\n\nOLS Regression Results\n"));
    assert_eq!(content.matches("OLS Regression Results").count(), 2);
    assert!(content.contains("\n\n\n\nsh_sz\n\nname,beta,rsquared,pvalue\n"));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_holdings_and_factor_exports() {
    let date = NaiveDate::from_ymd_opt(2016, 12, 30).unwrap();
    let holdings = vec![
        PortfolioExport::new(
            "4_groups_SL".to_string(),
            date,
            vec![
                PortfolioHolding::new("000002.SZ".to_string(), 0.6, Some(60.0), Some(0.1)),
                PortfolioHolding::new("600048.SH".to_string(), 0.4, Some(40.0), Some(0.2)),
            ],
        ),
        PortfolioExport::new(
            "4_groups_BH".to_string(),
            date,
            vec![PortfolioHolding::new("600383.SH".to_string(), 1.0, Some(500.0), Some(0.9))],
        ),
    ];
    let csv = holdings.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("4_groups_BH,2016-12-30,600383.SH,1,500,0.9"));

    let factors = vec![FactorSeriesRow {
        date: NaiveDate::from_ymd_opt(2016, 1, 8).unwrap(),
        scheme: "4_groups".to_string(),
        smb: 0.01,
        hml: -0.02,
    }];
    let csv = factors.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().next(), Some("date,scheme,smb,hml"));
    assert!(csv.contains("2016-01-08,4_groups,0.01,-0.02"));
}
