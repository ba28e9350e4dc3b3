//! Dataset ingestion from delimited text and free text
//!
//! This is the boundary where raw files become a [`Dataset`]; analytics
//! stages never decode file formats themselves.

use crate::data::{Dataset, Value};
use crate::error::{AnalyticsError, Result};
use csv::ReaderBuilder;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Cell spellings treated as missing
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Parse a single CSV cell into a value
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return Value::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => Value::from(v),
        Err(_) => Value::Text(trimmed.to_string()),
    }
}

/// Read a headed CSV document into a dataset
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AnalyticsError::DataError(format!("Failed to read headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(AnalyticsError::DataError("CSV has no columns".to_string()));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(parse_cell).collect());
    }

    log::debug!("Read CSV with {} columns and {} rows", headers.len(), rows.len());
    Dataset::from_rows(headers, rows)
}

/// Read a CSV file into a dataset
pub fn read_csv_path(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    read_csv(file)
}

/// Map free text to a single `text` column of lines
pub fn from_text_lines(text: &str) -> Result<Dataset> {
    let lines = text.lines().map(|l| Value::Text(l.to_string())).collect();
    Dataset::from_columns(vec![("text".to_string(), lines)])
}

/// Column names grouped by type tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnListing {
    pub all_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

/// List a dataset's columns for selection menus
pub fn column_listing(dataset: &Dataset) -> ColumnListing {
    let owned = |names: Vec<&str>| -> Vec<String> {
        names.into_iter().map(str::to_string).collect()
    };
    ColumnListing {
        all_columns: owned(dataset.column_names()),
        numeric_columns: owned(dataset.numeric_column_names()),
        categorical_columns: owned(dataset.text_column_names()),
    }
}
