//! Analytics configuration
//!
//! Every window, threshold and solver budget used by the pipeline lives here so
//! that a run can be reproduced from a single TOML file.

use crate::constants::*;
use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub market: MarketConfig,
    pub features: FeatureConfig,
    pub alpha: AlphaConfig,
    pub profiler: ProfilerConfig,
    pub optimizer: OptimizerConfig,
}

/// Indicator engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Periods per year; volatility is annualized by its square root
    pub trading_days_per_year: f64,
    pub volatility_window: usize,
    pub rsi_window: usize,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub high_volatility_multiplier: f64,
    pub support_resistance_window: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            volatility_window: 20,
            rsi_window: 14,
            sma_fast: 50,
            sma_slow: 200,
            high_volatility_multiplier: HIGH_VOLATILITY_MULTIPLIER,
            support_resistance_window: 50,
        }
    }
}

impl MarketConfig {
    pub fn annualization_factor(&self) -> f64 {
        annualization_factor(self.trading_days_per_year)
    }
}

/// Feature engineering windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub momentum_windows: Vec<usize>,
    pub roc_horizon: usize,
    pub volatility_window: usize,
    pub volatility_long_window: usize,
    pub mean_reversion_window: usize,
    pub volume_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            momentum_windows: vec![5, 10],
            roc_horizon: 12,
            volatility_window: 20,
            volatility_long_window: 60,
            mean_reversion_window: 20,
            volume_window: 20,
        }
    }
}

/// Alpha scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaConfig {
    pub signal_threshold: f64,
    /// Horizon used when deriving forward returns from a price column
    pub forward_horizon: usize,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
            forward_horizon: 1,
        }
    }
}

/// Tabular profiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub iqr_multiplier: f64,
    pub z_score_threshold: f64,
    pub min_rows_for_model: usize,
    pub forest_trees: usize,
    pub forest_max_depth: usize,
    pub forest_seed: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: IQR_MULTIPLIER,
            z_score_threshold: Z_SCORE_THRESHOLD,
            min_rows_for_model: MIN_ROWS_FOR_MODEL_IMPORTANCE,
            forest_trees: DEFAULT_FOREST_TREES,
            forest_max_depth: 32,
            forest_seed: DEFAULT_FOREST_SEED,
        }
    }
}

/// Portfolio solver budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Wall-clock budget for a single solve, in milliseconds
    pub time_budget_ms: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            time_budget_ms: None,
        }
    }
}

impl AnalyticsConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject settings no stage can run with
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("market.volatility_window", self.market.volatility_window),
            ("market.rsi_window", self.market.rsi_window),
            ("market.sma_fast", self.market.sma_fast),
            ("market.sma_slow", self.market.sma_slow),
            ("market.support_resistance_window", self.market.support_resistance_window),
            ("features.roc_horizon", self.features.roc_horizon),
            ("features.volatility_window", self.features.volatility_window),
            ("features.volatility_long_window", self.features.volatility_long_window),
            ("features.mean_reversion_window", self.features.mean_reversion_window),
            ("features.volume_window", self.features.volume_window),
            ("alpha.forward_horizon", self.alpha.forward_horizon),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(AnalyticsError::ConfigError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.features.momentum_windows.iter().any(|&w| w == 0) {
            return Err(AnalyticsError::ConfigError(
                "features.momentum_windows must not contain 0".to_string(),
            ));
        }
        if self.market.trading_days_per_year <= 0.0 {
            return Err(AnalyticsError::ConfigError(
                "market.trading_days_per_year must be positive".to_string(),
            ));
        }
        if self.alpha.signal_threshold < 0.0 {
            return Err(AnalyticsError::ConfigError(
                "alpha.signal_threshold must be non-negative".to_string(),
            ));
        }
        if self.optimizer.max_iterations == 0 {
            return Err(AnalyticsError::ConfigError(
                "optimizer.max_iterations must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.market.trading_days_per_year, 252.0);
        assert_eq!(config.market.volatility_window, 20);
        assert_eq!(config.market.rsi_window, 14);
        assert_eq!(config.features.momentum_windows, vec![5, 10]);
        assert_eq!(config.features.roc_horizon, 12);
        assert_eq!(config.alpha.signal_threshold, 0.5);
        assert_eq!(config.profiler.forest_trees, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AnalyticsConfig::from_toml_str(
            r#"
            [market]
            volatility_window = 10

            [optimizer]
            time_budget_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.market.volatility_window, 10);
        assert_eq!(config.market.rsi_window, 14);
        assert_eq!(config.optimizer.time_budget_ms, Some(250));
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = AnalyticsConfig::from_toml_str("[features]\nvolume_window = 0\n").unwrap_err();
        assert!(err.to_string().contains("features.volume_window"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AnalyticsConfig::from_toml_str("[market\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::TomlError(_)));
    }
}
