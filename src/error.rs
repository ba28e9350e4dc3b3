//! Error types for the analytics pipeline

use thiserror::Error;

/// Main error type for alpha-discovery
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column '{column}' has wrong type: expected {expected}, found {found}")]
    WrongColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Insufficient history: required {required} observations, available {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Optimization failure: {0}")]
    OptimizationFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl AnalyticsError {
    /// True for input-validation failures raised before any numeric work
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AnalyticsError::DataError(_)
                | AnalyticsError::ColumnNotFound(_)
                | AnalyticsError::WrongColumnType { .. }
                | AnalyticsError::InvalidParameter(_)
        )
    }
}

/// Result type alias for alpha-discovery operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
