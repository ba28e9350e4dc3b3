//! Analytics constants and defaults
//!
//! Contains default values shared by the profiler, the indicator and feature
//! engines, and the portfolio optimizer

/// Trading calendar constants
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Tukey fence multiplier for inter-quartile-range outliers
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Absolute z-score above which a value is an outlier
pub const Z_SCORE_THRESHOLD: f64 = 3.0;

/// Current volatility above this multiple of the mean is a high-volatility regime
pub const HIGH_VOLATILITY_MULTIPLIER: f64 = 1.5;

/// Minimum rows before a model-based importance fit is attempted
pub const MIN_ROWS_FOR_MODEL_IMPORTANCE: usize = 10;

/// Forest used for model-based importance
pub const DEFAULT_FOREST_TREES: usize = 50;
pub const DEFAULT_FOREST_SEED: u64 = 42;

/// Default symmetric alpha signal threshold
pub const DEFAULT_SIGNAL_THRESHOLD: f64 = 0.5;

/// Weight-sum tolerance for simplex allocations
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Zero tolerance for floating point comparisons
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// Annualization factor for a per-period statistic
pub fn annualization_factor(periods_per_year: f64) -> f64 {
    periods_per_year.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(TRADING_DAYS_PER_YEAR, 252.0);
        assert_eq!(IQR_MULTIPLIER, 1.5);
        assert_eq!(Z_SCORE_THRESHOLD, 3.0);
        assert!(ZERO_TOLERANCE > 0.0);
        assert!((annualization_factor(TRADING_DAYS_PER_YEAR) - 15.874507866387544).abs() < 1e-12);
    }
}
