//! Tabular dataset handling
//!
//! A [`Dataset`] is an immutable, column-major table. Each column's type is
//! decided once when the dataset is built and recorded as a [`ColumnType`]
//! tag; every stage switches on that tag instead of re-inspecting cells.

pub mod ingest;

use crate::error::{AnalyticsError, Result};
use crate::types::Series;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Value::Missing
        } else {
            Value::Number(v)
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::from).unwrap_or(Value::Missing)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Column type tag recorded at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Every cell present and integral
    Integer,
    /// Numeric, possibly with missing cells
    Float,
    /// At least one non-numeric cell
    Text,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
        }
    }
}

/// Typed column storage
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Series),
    Text(Vec<Option<String>>),
}

/// Named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    data: ColumnData,
}

impl Column {
    /// Build a column, deciding its type tag from the values
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let name = name.into();
        let is_text = values.iter().any(|v| matches!(v, Value::Text(_)));

        if is_text {
            let data = values
                .into_iter()
                .map(|v| match v {
                    Value::Text(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Missing => None,
                })
                .collect();
            return Self {
                name,
                column_type: ColumnType::Text,
                data: ColumnData::Text(data),
            };
        }

        let series: Series = values.iter().map(Value::as_f64).collect();
        let integral = !series.is_empty()
            && series
                .iter()
                .all(|v| matches!(v, Some(x) if x.fract() == 0.0 && x.is_finite()));
        Self {
            name,
            column_type: if integral {
                ColumnType::Integer
            } else {
                ColumnType::Float
            },
            data: ColumnData::Numeric(series),
        }
    }

    /// Build a numeric column directly from a series
    pub fn numeric(name: impl Into<String>, series: Series) -> Self {
        let values = series.into_iter().map(Value::from).collect();
        Self::new(name, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Approximate heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len() * std::mem::size_of::<Option<f64>>(),
            ColumnData::Text(v) => v
                .iter()
                .map(|s| {
                    std::mem::size_of::<Option<String>>()
                        + s.as_ref().map(|s| s.capacity()).unwrap_or(0)
                })
                .sum(),
        }
    }

    fn value(&self, row: usize) -> Value {
        match &self.data {
            ColumnData::Numeric(v) => Value::from(v[row]),
            ColumnData::Text(v) => v[row].clone().map(Value::Text).unwrap_or(Value::Missing),
        }
    }
}

/// Immutable, time-ordered table of typed columns
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    n_rows: usize,
}

impl Dataset {
    /// Build from typed columns; all columns must share one length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut index = HashMap::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            if column.len() != n_rows {
                return Err(AnalyticsError::DataError(format!(
                    "Column '{}' has {} rows, expected {}",
                    column.name, column.len(), n_rows
                )));
            }
            if index.insert(column.name.clone(), i).is_some() {
                return Err(AnalyticsError::DataError(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }
        }

        Ok(Self {
            columns,
            index,
            n_rows,
        })
    }

    /// Build from column name / values pairs
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    /// Build from numeric series
    pub fn from_numeric_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| {
                    Column::new(name, values.into_iter().map(Value::from).collect())
                })
                .collect(),
        )
    }

    /// Build from a header and row-major records
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let width = headers.len();
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(AnalyticsError::DataError(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Self::from_columns(headers.into_iter().zip(columns).collect())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(Column::column_type)
    }

    /// Names of numeric columns, in column order
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of text (categorical) columns, in column order
    pub fn text_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Text)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Numeric view of a column
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        let column = self
            .column(name)
            .ok_or_else(|| AnalyticsError::ColumnNotFound(name.to_string()))?;
        column
            .as_numeric()
            .ok_or_else(|| AnalyticsError::WrongColumnType {
                column: name.to_string(),
                expected: "numeric".to_string(),
                found: column.column_type.to_string(),
            })
    }

    /// Row `i` as a vector of values, in column order
    pub fn row(&self, i: usize) -> Option<Vec<Value>> {
        if i >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.value(i)).collect())
    }

    /// Fail with a data error when there are no rows
    pub fn require_rows(&self) -> Result<()> {
        if self.n_rows == 0 {
            return Err(AnalyticsError::DataError("Dataset is empty".to_string()));
        }
        Ok(())
    }
}
