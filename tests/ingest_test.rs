//! File-backed ingestion and configuration loading

use alpha_discovery::config::AnalyticsConfig;
use alpha_discovery::data::ingest::{column_listing, from_text_lines, read_csv_path};
use alpha_discovery::data::{ColumnType, Value};
use alpha_discovery::error::AnalyticsError;
use alpha_discovery::profiler::Profiler;
use std::fs;

#[test]
fn test_read_csv_with_missing_markers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    fs::write(
        &path,
        "ticker,close,volume\nAAA,10.5,100\nBBB,NA,200\nCCC,null,\nDDD,12.0,N/A\n",
    )
    .unwrap();

    let ds = read_csv_path(&path).unwrap();
    assert_eq!(ds.n_rows(), 4);
    assert_eq!(ds.column_type("ticker"), Some(ColumnType::Text));
    assert_eq!(ds.column_type("close"), Some(ColumnType::Float));
    // missing cells keep an integral column from being tagged Integer
    assert_eq!(ds.column_type("volume"), Some(ColumnType::Float));
    assert_eq!(
        ds.numeric("close").unwrap(),
        &[Some(10.5), None, None, Some(12.0)]
    );
    assert_eq!(ds.row(0).unwrap()[0], Value::Text("AAA".to_string()));

    let nulls = Profiler::default().null_summary(&ds);
    assert_eq!(nulls.total_nulls, 4);
    assert_eq!(nulls.null_counts["close"], 2);
    assert_eq!(nulls.null_counts["volume"], 2);
    assert_eq!(nulls.null_counts["ticker"], 0);

    let listing = column_listing(&ds);
    assert_eq!(listing.numeric_columns, vec!["close", "volume"]);
    assert_eq!(listing.categorical_columns, vec!["ticker"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_csv_path(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, AnalyticsError::IoError(_)));
}

#[test]
fn test_duplicate_headers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.csv");
    fs::write(&path, "a,a\n1,2\n").unwrap();
    assert!(matches!(
        read_csv_path(&path),
        Err(AnalyticsError::DataError(_))
    ));
}

#[test]
fn test_text_lines_dataset() {
    let ds = from_text_lines("alpha\nbeta\n\ngamma").unwrap();
    assert_eq!(ds.n_rows(), 4);
    assert_eq!(ds.column_type("text"), Some(ColumnType::Text));
    assert!(ds.numeric_column_names().is_empty());
}

#[test]
fn test_load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[market]
volatility_window = 10
sma_fast = 20

[alpha]
signal_threshold = 0.8

[optimizer]
max_iterations = 250
time_budget_ms = 500
"#,
    )
    .unwrap();

    let config = AnalyticsConfig::load(&path).unwrap();
    assert_eq!(config.market.volatility_window, 10);
    assert_eq!(config.market.sma_fast, 20);
    assert_eq!(config.market.sma_slow, 200);
    assert_eq!(config.alpha.signal_threshold, 0.8);
    assert_eq!(config.optimizer.max_iterations, 250);
    assert_eq!(config.optimizer.time_budget_ms, Some(500));
    assert_eq!(config.profiler, AnalyticsConfig::default().profiler);
}

#[test]
fn test_load_config_rejects_negative_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[alpha]\nsignal_threshold = -1.0\n").unwrap();
    assert!(matches!(
        AnalyticsConfig::load(&path),
        Err(AnalyticsError::ConfigError(_))
    ));
}
