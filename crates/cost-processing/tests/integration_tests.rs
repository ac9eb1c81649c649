//! Integration tests for cleaning, encoding and profiling.
//!
//! These tests run the processing stages end to end on a small cost export.

use cost_processing::{
    DataCleaner, DataProfiler, FeatureEncoder, ProcessingConfig, ProcessingError, read_csv_file,
    read_csv_str,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture() -> DataFrame {
    read_csv_file(fixtures_path().join("cost_analysis.csv")).expect("fixture should load")
}

fn complete_rows_config() -> ProcessingConfig {
    ProcessingConfig::builder()
        .drop_incomplete_rows(true)
        .build()
        .unwrap()
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_fixture_cleaning() {
    let raw = load_fixture();
    assert_eq!(raw.height(), 51);

    let (cleaned, report) = DataCleaner::default().clean(raw).unwrap();

    assert_eq!(report.duplicates_removed, 2);
    assert_eq!(cleaned.height(), 49);
    assert_eq!(report.date_parse_failure_count(), 1);
    assert_eq!(
        report.date_parse_failures[0].value.as_deref(),
        Some("not-a-date")
    );
    assert!(cleaned.column("UsageDate").is_err());

    let names: Vec<String> = cleaned
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(&names[names.len() - 3..], &["Year", "Month", "Day"]);
}

#[test]
fn test_cleaning_is_idempotent() {
    let config = ProcessingConfig::default();
    let (once, _) = DataCleaner::new(config.clone()).clean(load_fixture()).unwrap();

    // Re-running dedup on already-clean rows changes nothing.
    let (twice, removed) = cost_processing::cleaner::remove_duplicates(&once).unwrap();
    assert_eq!(removed, 0);
    assert!(twice.equals_missing(&once));
}

#[test]
fn test_float_duplicates_follow_value_equality() {
    let raw = df!(
        "UsageDate" => ["2024-03-01", "2024-03-02", "2024-03-01", "2024-03-04", "2024-03-02", "2024-03-04"],
        "ServiceName" => ["Storage", "Compute", "Storage", "Compute", "Compute", "Compute"],
        "Cost" => [0.0, 4.25, -0.0, f64::NAN, 4.25, f64::NAN]
    )
    .unwrap();
    let (cleaned, report) = DataCleaner::default().clean(raw).unwrap();

    assert_eq!(report.duplicates_removed, 3);
    assert_eq!(cleaned.height(), 3);

    let days: Vec<Option<i32>> = cleaned
        .column("Day")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(days, vec![Some(1), Some(2), Some(4)]);
}

#[test]
fn test_three_row_scenario() {
    let csv = "UsageDate,ServiceName,Cost\n\
               2024-01-05,Storage,10\n\
               2024-01-05,Storage,10\n\
               bad-date,Compute,3\n";
    let raw = read_csv_str(csv).unwrap();
    let (cleaned, report) = DataCleaner::default().clean(raw).unwrap();

    assert_eq!(cleaned.height(), 2);
    assert_eq!(report.date_parse_failure_count(), 1);

    let years: Vec<Option<i32>> = cleaned
        .column("Year")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(years, vec![Some(2024), None]);
}

#[test]
fn test_missing_date_column_is_configuration_error() {
    let raw = read_csv_str("ServiceName,Cost\nStorage,1\n").unwrap();
    let err = DataCleaner::default().clean(raw).unwrap_err();
    assert!(matches!(err, ProcessingError::ColumnNotFound(ref c) if c == "UsageDate"));
    assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_fixture_encoding_layout() {
    let config = complete_rows_config();
    let (cleaned, _) = DataCleaner::new(config.clone()).clean(load_fixture()).unwrap();
    let encoded = FeatureEncoder::new(config).fit_transform(&cleaned).unwrap();

    assert_eq!(
        encoded.features.feature_names(),
        &[
            "Quantity",
            "Year",
            "Month",
            "Day",
            "ServiceName_Databases",
            "ServiceName_Networking",
            "ServiceName_Storage",
            "ResourceGroup_rg-prod",
            "ResourceGroup_rg-shared",
        ]
    );

    // The unparseable date row is dropped together with its target.
    assert_eq!(encoded.rows_dropped, 1);
    assert_eq!(encoded.features.n_rows(), 48);
    assert_eq!(encoded.target.len(), encoded.features.n_rows());
}

#[test]
fn test_indicator_blocks_are_one_hot() {
    let config = complete_rows_config();
    let (cleaned, _) = DataCleaner::new(config.clone()).clean(load_fixture()).unwrap();
    let encoded = FeatureEncoder::new(config).fit_transform(&cleaned).unwrap();

    for row in encoded.features.rows() {
        let service: f64 = row[4..7].iter().sum();
        let group: f64 = row[7..9].iter().sum();
        assert!(service == 0.0 || service == 1.0);
        assert!(group == 0.0 || group == 1.0);
    }
}

#[test]
fn test_schema_reapplies_to_new_frame() {
    let config = complete_rows_config();
    let (cleaned, _) = DataCleaner::new(config.clone()).clean(load_fixture()).unwrap();
    let encoded = FeatureEncoder::new(config.clone()).fit_transform(&cleaned).unwrap();

    let fresh = read_csv_str(
        "UsageDate,ServiceName,ResourceGroup,Quantity,Cost\n\
         2024-03-01,Storage,rg-unknown,10,0\n",
    )
    .unwrap();
    let (fresh, _) = DataCleaner::new(config).clean(fresh).unwrap();
    let matrix = encoded.schema.transform(&fresh).unwrap();

    assert_eq!(matrix.n_features(), encoded.features.n_features());
    assert_eq!(
        matrix.rows()[0],
        vec![10.0, 2024.0, 3.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    );
}

// ============================================================================
// Profiling
// ============================================================================

#[test]
fn test_fixture_profile() {
    let (cleaned, _) = DataCleaner::default().clean(load_fixture()).unwrap();
    let report = DataProfiler::default().profile(&cleaned).unwrap();

    assert_eq!(report.row_count, 49);
    assert!(report.numeric_column("Cost").is_none());
    assert!(report.numeric_column("Quantity").is_some());

    let year = report.numeric_column("Year").unwrap();
    assert_eq!(year.null_count, 1);

    let r = report.correlation.get("Quantity", "Cost").unwrap();
    assert!(r > 0.0);
}
