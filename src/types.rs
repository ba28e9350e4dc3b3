//! Core types shared by every pipeline stage

use chrono::{DateTime, Utc};

/// Timestamp type used for trade receipts
pub type Timestamp = DateTime<Utc>;

/// Aligned numeric sequence; `None` marks a missing or undefined entry
pub type Series = Vec<Option<f64>>;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Quantity/volume type
pub type Quantity = f64;

/// Row position within a dataset
pub type RowIndex = usize;

/// Count of present (non-missing) entries in a series
pub fn present_count(series: &[Option<f64>]) -> usize {
    series.iter().filter(|v| v.is_some()).count()
}

/// Present entries of a series, in order
pub fn present_values(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().flatten().copied().collect()
}

/// Last entry of a series, if it is present
pub fn last_present(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Turn a non-finite float into a missing entry
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
