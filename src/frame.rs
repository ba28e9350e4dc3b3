//! Named, row-aligned numeric series
//!
//! [`SeriesFrame`] backs both the indicator set and the feature matrix: every
//! series it holds has exactly the row count of the source dataset.

use crate::error::{AnalyticsError, Result};
use crate::types::{present_count, Series};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered collection of aligned series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    n_rows: usize,
    columns: Vec<(String, Series)>,
}

/// Indicator name to aligned series
pub type IndicatorSet = SeriesFrame;

/// Feature name to aligned series
pub type FeatureMatrix = SeriesFrame;

impl SeriesFrame {
    /// Create an empty frame for `n_rows` rows
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    /// Insert or replace a series; its length must equal the row count
    pub fn insert(&mut self, name: impl Into<String>, series: Series) -> Result<()> {
        let name = name.into();
        if series.len() != self.n_rows {
            return Err(AnalyticsError::DataError(format!(
                "Series '{}' has {} rows, expected {}",
                name,
                series.len(),
                self.n_rows
            )));
        }
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = series,
            None => self.columns.push((name, series)),
        }
        Ok(())
    }

    /// Move every series of `other` into this frame
    pub fn extend(&mut self, other: SeriesFrame) -> Result<()> {
        for (name, series) in other.columns {
            self.insert(name, series)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.columns.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Present-value count per series
    pub fn coverage(&self) -> Vec<(&str, usize)> {
        self.iter().map(|(n, s)| (n, present_count(s))).collect()
    }
}

impl Serialize for SeriesFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, series) in &self.columns {
            map.serialize_entry(name, series)?;
        }
        map.end()
    }
}
