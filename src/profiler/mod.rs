//! Tabular profiler
//!
//! Shape, type and null summaries, descriptive statistics, outlier detection
//! and feature importance for an arbitrary dataset. Every report is built
//! fresh from the dataset; degenerate columns yield empty entries instead of
//! errors.

pub mod forest;

use crate::config::ProfilerConfig;
use crate::data::{ColumnType, Dataset};
use crate::error::{AnalyticsError, Result};
use crate::stats::{mean, pearson, quantile_sorted, sample_std, sorted};
use crate::types::{present_values, RowIndex};
use forest::{ForestConfig, RandomForest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-column entry of [`BasicInfo`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub null_count: usize,
    pub null_percentage: f64,
}

/// Shape, types and nulls of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub n_rows: usize,
    pub n_columns: usize,
    pub columns: Vec<ColumnInfo>,
    /// Approximate footprint in bytes
    pub memory_usage: usize,
}

/// Descriptive statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Outlier detection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Outside `[Q1 - k*IQR, Q3 + k*IQR]`
    Iqr,
    /// `|x - mean| / std` above the threshold
    ZScore,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => write!(f, "iqr"),
            OutlierMethod::ZScore => write!(f, "zscore"),
        }
    }
}

impl std::str::FromStr for OutlierMethod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" | "z" => Ok(OutlierMethod::ZScore),
            other => Err(AnalyticsError::InvalidParameter(format!(
                "unknown outlier method '{}'",
                other
            ))),
        }
    }
}

/// Flagged row indices per numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub outliers: BTreeMap<String, Vec<RowIndex>>,
}

impl OutlierReport {
    pub fn total(&self) -> usize {
        self.outliers.values().map(Vec::len).sum()
    }
}

/// Correlation- and model-based importance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportanceReport {
    /// Column used as the target, if any
    pub target: Option<String>,
    /// Absolute correlation with the target, descending
    pub correlation: Vec<(String, f64)>,
    /// Normalized forest importance per feature column
    pub model: BTreeMap<String, f64>,
}

/// Null counts across the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullSummary {
    pub null_counts: BTreeMap<String, usize>,
    pub null_percentage: BTreeMap<String, f64>,
    pub total_nulls: usize,
}

/// Pairwise Pearson correlations over the numeric columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `None` where undefined
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn null_percentage(nulls: usize, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        nulls as f64 / rows as f64 * 100.0
    }
}

/// Profiler with fixed outlier and importance settings
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    config: ProfilerConfig,
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Row and column counts, type tags, null counts and memory footprint
    pub fn basic_info(&self, dataset: &Dataset) -> BasicInfo {
        let n_rows = dataset.n_rows();
        let columns = dataset
            .columns()
            .iter()
            .map(|c| {
                let nulls = c.null_count();
                ColumnInfo {
                    name: c.name().to_string(),
                    column_type: c.column_type(),
                    null_count: nulls,
                    null_percentage: null_percentage(nulls, n_rows),
                }
            })
            .collect();

        BasicInfo {
            n_rows,
            n_columns: dataset.n_columns(),
            columns,
            memory_usage: dataset.columns().iter().map(|c| c.memory_usage()).sum(),
        }
    }

    /// Count, mean, std, min, quartiles and max per numeric column
    pub fn descriptive_stats(&self, dataset: &Dataset) -> BTreeMap<String, ColumnStats> {
        dataset
            .columns()
            .iter()
            .filter_map(|c| Some((c.name(), c.as_numeric()?)))
            .map(|(name, series)| {
                let values = sorted(&present_values(series));
                let stats = ColumnStats {
                    count: values.len(),
                    mean: mean(&values),
                    std: sample_std(&values),
                    min: values.first().copied(),
                    q25: quantile_sorted(&values, 0.25),
                    median: quantile_sorted(&values, 0.5),
                    q75: quantile_sorted(&values, 0.75),
                    max: values.last().copied(),
                };
                (name.to_string(), stats)
            })
            .collect()
    }

    /// Flag outlying rows of every numeric column.
    ///
    /// Boundaries are exclusive; missing cells are never flagged. Under the
    /// z-score rule a column without a positive sample std flags nothing.
    pub fn detect_outliers(&self, dataset: &Dataset, method: OutlierMethod) -> OutlierReport {
        let mut outliers = BTreeMap::new();

        for column in dataset.columns() {
            let series = match column.as_numeric() {
                Some(s) => s,
                None => continue,
            };
            let values = present_values(series);

            let is_outlier: Box<dyn Fn(f64) -> bool> = match method {
                OutlierMethod::Iqr => {
                    let ordered = sorted(&values);
                    match (
                        quantile_sorted(&ordered, 0.25),
                        quantile_sorted(&ordered, 0.75),
                    ) {
                        (Some(q1), Some(q3)) => {
                            let iqr = q3 - q1;
                            let lower = q1 - self.config.iqr_multiplier * iqr;
                            let upper = q3 + self.config.iqr_multiplier * iqr;
                            Box::new(move |v: f64| v < lower || v > upper)
                        }
                        _ => Box::new(|_: f64| false),
                    }
                }
                OutlierMethod::ZScore => match (mean(&values), sample_std(&values)) {
                    (Some(m), Some(s)) if s > 0.0 => {
                        let threshold = self.config.z_score_threshold;
                        Box::new(move |v: f64| ((v - m) / s).abs() > threshold)
                    }
                    _ => Box::new(|_: f64| false),
                },
            };

            let rows: Vec<RowIndex> = series
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.filter(|v| is_outlier(*v)).map(|_| i))
                .collect();
            outliers.insert(column.name().to_string(), rows);
        }

        let report = OutlierReport { method, outliers };
        log::info!(
            "Outlier detection ({}): {} rows flagged",
            method,
            report.total()
        );
        report
    }

    /// Null counts per column and overall
    pub fn null_summary(&self, dataset: &Dataset) -> NullSummary {
        let n_rows = dataset.n_rows();
        let mut null_counts = BTreeMap::new();
        let mut percentages = BTreeMap::new();
        for column in dataset.columns() {
            let nulls = column.null_count();
            null_counts.insert(column.name().to_string(), nulls);
            percentages.insert(column.name().to_string(), null_percentage(nulls, n_rows));
        }
        NullSummary {
            total_nulls: null_counts.values().sum(),
            null_counts,
            null_percentage: percentages,
        }
    }

    /// Pairwise-complete Pearson correlations; empty with fewer than two
    /// numeric columns
    pub fn correlation_matrix(&self, dataset: &Dataset) -> CorrelationMatrix {
        let numeric: Vec<(&str, &[Option<f64>])> = dataset
            .columns()
            .iter()
            .filter_map(|c| Some((c.name(), c.as_numeric()?)))
            .collect();
        if numeric.len() < 2 {
            return CorrelationMatrix {
                columns: Vec::new(),
                values: Vec::new(),
            };
        }

        let values = numeric
            .iter()
            .map(|(_, a)| numeric.iter().map(|(_, b)| pearson(a, b)).collect())
            .collect();
        CorrelationMatrix {
            columns: numeric.iter().map(|(n, _)| n.to_string()).collect(),
            values,
        }
    }

    /// Correlation and forest importance against a target column.
    ///
    /// The correlation ranking needs `target` to name a numeric column, and
    /// leaves the target itself out since its self-correlation is always 1.
    /// The forest fit needs enough rows, at least two numeric columns and no
    /// all-missing column; otherwise its report is empty. Without a usable
    /// `target` the first numeric column is the forest's target.
    pub fn feature_importance(&self, dataset: &Dataset, target: Option<&str>) -> ImportanceReport {
        let numeric: Vec<(&str, &[Option<f64>])> = dataset
            .columns()
            .iter()
            .filter_map(|c| Some((c.name(), c.as_numeric()?)))
            .collect();
        if numeric.len() < 2 {
            log::warn!("Feature importance needs at least 2 numeric columns");
            return ImportanceReport::default();
        }

        let target_idx = match target {
            Some(name) => match numeric.iter().position(|(n, _)| *n == name) {
                Some(i) => Some(i),
                None => {
                    log::warn!("Target '{}' is not a numeric column", name);
                    None
                }
            },
            None => None,
        };

        let mut report = ImportanceReport::default();

        if let Some(t) = target_idx {
            let target_series = numeric[t].1;
            let mut ranking: Vec<(String, f64)> = numeric
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != t)
                .filter_map(|(_, (name, series))| {
                    pearson(series, target_series).map(|c| (name.to_string(), c.abs()))
                })
                .collect();
            ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
            report.correlation = ranking;
        }

        let model_target = target_idx.unwrap_or(0);
        report.target = Some(numeric[model_target].0.to_string());
        report.model = self.model_importance(&numeric, model_target, dataset.n_rows());
        report
    }

    fn model_importance(
        &self,
        numeric: &[(&str, &[Option<f64>])],
        target: usize,
        n_rows: usize,
    ) -> BTreeMap<String, f64> {
        if n_rows < self.config.min_rows_for_model {
            log::info!(
                "Skipping model importance: {} rows, need {}",
                n_rows,
                self.config.min_rows_for_model
            );
            return BTreeMap::new();
        }

        // Mean-impute every numeric column
        let mut imputed: Vec<Vec<f64>> = Vec::with_capacity(numeric.len());
        for (name, series) in numeric {
            let fill = match mean(&present_values(series)) {
                Some(m) => m,
                None => {
                    log::warn!("Skipping model importance: column '{}' has no values", name);
                    return BTreeMap::new();
                }
            };
            imputed.push(series.iter().map(|v| v.unwrap_or(fill)).collect());
        }

        let feature_cols: Vec<usize> = (0..numeric.len()).filter(|&i| i != target).collect();
        let x: Vec<Vec<f64>> = (0..n_rows)
            .map(|row| feature_cols.iter().map(|&c| imputed[c][row]).collect())
            .collect();
        let y = &imputed[target];

        let mut forest = RandomForest::new(ForestConfig::from(&self.config));
        if let Err(e) = forest.fit(&x, y) {
            log::warn!("Forest fit failed: {}", e);
            return BTreeMap::new();
        }

        feature_cols
            .iter()
            .zip(forest.feature_importances())
            .map(|(&c, &imp)| (numeric[c].0.to_string(), imp))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use approx::assert_relative_eq;

    fn spike(n: usize) -> Dataset {
        let mut values = vec![1.0; n - 1];
        values.push(1000.0);
        Dataset::from_numeric_columns(vec![("x", values)]).unwrap()
    }

    #[test]
    fn test_basic_info() {
        let ds = Dataset::from_columns(vec![
            ("a".to_string(), vec![Value::from(1.0), Value::Missing]),
            ("b".to_string(), vec![Value::from("x"), Value::from("y")]),
        ])
        .unwrap();
        let info = Profiler::default().basic_info(&ds);

        assert_eq!(info.n_rows, 2);
        assert_eq!(info.n_columns, 2);
        assert_eq!(info.columns[0].column_type, ColumnType::Float);
        assert_eq!(info.columns[0].null_count, 1);
        assert_relative_eq!(info.columns[0].null_percentage, 50.0);
        assert_eq!(info.columns[1].column_type, ColumnType::Text);
        assert!(info.memory_usage > 0);
    }

    #[test]
    fn test_descriptive_stats() {
        let ds = Dataset::from_numeric_columns(vec![("v", vec![4.0, 1.0, 3.0, 2.0])]).unwrap();
        let stats = Profiler::default().descriptive_stats(&ds);
        let v = &stats["v"];

        assert_eq!(v.count, 4);
        assert_relative_eq!(v.mean.unwrap(), 2.5);
        assert_relative_eq!(v.std.unwrap(), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(v.min, Some(1.0));
        assert_relative_eq!(v.q25.unwrap(), 1.75);
        assert_relative_eq!(v.median.unwrap(), 2.5);
        assert_relative_eq!(v.q75.unwrap(), 3.25);
        assert_eq!(v.max, Some(4.0));
    }

    #[test]
    fn test_descriptive_stats_without_numeric_columns() {
        let ds = Dataset::from_columns(vec![("t".to_string(), vec![Value::from("a")])]).unwrap();
        assert!(Profiler::default().descriptive_stats(&ds).is_empty());
    }

    #[test]
    fn test_spike_flagged_by_both_methods() {
        let ds = spike(20);
        let profiler = Profiler::default();

        let iqr = profiler.detect_outliers(&ds, OutlierMethod::Iqr);
        assert_eq!(iqr.outliers["x"], vec![19]);
        let z = profiler.detect_outliers(&ds, OutlierMethod::ZScore);
        assert_eq!(z.outliers["x"], vec![19]);
    }

    #[test]
    fn test_constant_column_has_no_zscore_outliers() {
        let ds = Dataset::from_numeric_columns(vec![("c", vec![5.0; 12])]).unwrap();
        let report = Profiler::default().detect_outliers(&ds, OutlierMethod::ZScore);
        assert!(report.outliers["c"].is_empty());
    }

    #[test]
    fn test_iqr_boundary_is_exclusive() {
        // Q1 = 2, Q3 = 4, IQR = 2: lower bound -1, upper bound 7
        let values = vec![-1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 7.0];
        let ds = Dataset::from_numeric_columns(vec![("b", values)]).unwrap();
        let report = Profiler::default().detect_outliers(&ds, OutlierMethod::Iqr);
        assert!(report.outliers["b"].is_empty());

        let values = vec![-1.5, 2.0, 2.0, 3.0, 4.0, 4.0, 7.0];
        let ds = Dataset::from_numeric_columns(vec![("b", values)]).unwrap();
        let report = Profiler::default().detect_outliers(&ds, OutlierMethod::Iqr);
        assert_eq!(report.outliers["b"], vec![0]);
    }

    #[test]
    fn test_outliers_skip_missing_cells() {
        let mut values: Vec<Value> = (0..19).map(|_| Value::from(1.0)).collect();
        values.push(Value::Missing);
        values.push(Value::from(1000.0));
        let ds = Dataset::from_columns(vec![("x".to_string(), values)]).unwrap();
        let report = Profiler::default().detect_outliers(&ds, OutlierMethod::Iqr);
        assert_eq!(report.outliers["x"], vec![20]);
    }

    #[test]
    fn test_null_summary() {
        let ds = Dataset::from_columns(vec![
            ("a".to_string(), vec![Value::Missing, Value::Missing]),
            ("b".to_string(), vec![Value::from(1.0), Value::Missing]),
        ])
        .unwrap();
        let summary = Profiler::default().null_summary(&ds);
        assert_eq!(summary.total_nulls, 3);
        assert_eq!(summary.null_counts["a"], 2);
        assert_relative_eq!(summary.null_percentage["b"], 50.0);
    }

    #[test]
    fn test_correlation_matrix() {
        let ds = Dataset::from_numeric_columns(vec![
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![3.0, 2.0, 1.0]),
            ("c", vec![1.0, 1.0, 1.0]),
        ])
        .unwrap();
        let matrix = Profiler::default().correlation_matrix(&ds);

        assert_relative_eq!(matrix.get("a", "b").unwrap(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix.get("a", "a").unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(matrix.get("a", "c"), None);

        let single = Dataset::from_numeric_columns(vec![("a", vec![1.0, 2.0])]).unwrap();
        assert!(Profiler::default().correlation_matrix(&single).is_empty());
    }

    fn importance_dataset(n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 7) % 3) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        Dataset::from_numeric_columns(vec![("y", y), ("x", x), ("noise", noise)]).unwrap()
    }

    #[test]
    fn test_feature_importance_with_target() {
        let ds = importance_dataset(40);
        let report = Profiler::default().feature_importance(&ds, Some("y"));

        assert_eq!(report.target.as_deref(), Some("y"));
        assert_eq!(report.correlation[0].0, "x");
        assert_relative_eq!(report.correlation[0].1, 1.0, epsilon = 1e-12);
        assert!(report.correlation.iter().all(|(name, _)| name != "y"));

        assert_eq!(report.model.len(), 2);
        assert!(report.model["x"] > report.model["noise"]);
        assert_relative_eq!(report.model.values().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_feature_importance_defaults_to_first_column() {
        let ds = importance_dataset(40);
        let report = Profiler::default().feature_importance(&ds, None);

        assert!(report.correlation.is_empty());
        assert_eq!(report.target.as_deref(), Some("y"));
        assert!(!report.model.contains_key("y"));
        assert_eq!(report.model.len(), 2);
    }

    #[test]
    fn test_feature_importance_guards() {
        let profiler = Profiler::default();

        // too few rows: correlation only
        let small = importance_dataset(9);
        let report = profiler.feature_importance(&small, Some("y"));
        assert!(!report.correlation.is_empty());
        assert!(report.model.is_empty());

        // one numeric column: nothing
        let single = Dataset::from_numeric_columns(vec![("a", vec![1.0; 20])]).unwrap();
        assert_eq!(
            profiler.feature_importance(&single, None),
            ImportanceReport::default()
        );

        // an all-missing column blocks the fit
        let ds = Dataset::from_columns(vec![
            ("y".to_string(), (0..12).map(|i| Value::from(i as f64)).collect()),
            ("gap".to_string(), vec![Value::Missing; 12]),
        ])
        .unwrap();
        assert!(profiler.feature_importance(&ds, None).model.is_empty());
    }
}
