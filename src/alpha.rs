//! Alpha scoring
//!
//! Combines an engineered feature matrix with an aligned return series into a
//! correlation-weighted composite score, symmetric threshold signals and a
//! conditional-mean backtest.

use crate::config::AlphaConfig;
use crate::error::{AnalyticsError, Result};
use crate::frame::FeatureMatrix;
use crate::stats::{mean, pearson, population_std};
use crate::types::{finite, present_count, present_values, Series};
use serde::{Deserialize, Serialize};

/// Buy and sell flags per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet {
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
}

impl SignalSet {
    /// Buy where `score > threshold`, sell where `score < -threshold`.
    ///
    /// A missing score raises neither flag.
    pub fn from_scores(scores: &[Option<f64>], threshold: f64) -> Result<Self> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "signal threshold must be non-negative, got {}",
                threshold
            )));
        }
        let buy = scores
            .iter()
            .map(|s| s.map_or(false, |v| v > threshold))
            .collect();
        let sell = scores
            .iter()
            .map(|s| s.map_or(false, |v| v < -threshold))
            .collect();
        Ok(Self { buy, sell })
    }

    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }

    pub fn buy_count(&self) -> usize {
        self.buy.iter().filter(|b| **b).count()
    }

    pub fn sell_count(&self) -> usize {
        self.sell.iter().filter(|s| **s).count()
    }
}

/// Mean payoff of the long and short legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Mean return over buy rows, `None` without any
    pub long_return: Option<f64>,
    /// Mean negated return over sell rows, `None` without any
    pub short_return: Option<f64>,
    pub long_count: usize,
    pub short_count: usize,
}

impl std::fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pct = |v: Option<f64>| match v {
            Some(v) => format!("{:.4}%", v * 100.0),
            None => "n/a".to_string(),
        };
        writeln!(f, "Backtest:")?;
        writeln!(f, "  Long:  {} over {} rows", pct(self.long_return), self.long_count)?;
        writeln!(f, "  Short: {} over {} rows", pct(self.short_return), self.short_count)?;
        Ok(())
    }
}

/// Return from `t` to `t + horizon`; the trailing `horizon` rows are missing
pub fn forward_returns(close: &[Option<f64>], horizon: usize) -> Result<Series> {
    if horizon == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "forward return horizon must be greater than 0".to_string(),
        ));
    }
    Ok((0..close.len())
        .map(|t| {
            let now = close[t]?;
            let later = (*close.get(t + horizon)?)?;
            if now == 0.0 {
                return None;
            }
            finite(later / now - 1.0)
        })
        .collect())
}

/// Scorer over a feature matrix and its aligned return series
#[derive(Debug, Clone)]
pub struct AlphaScorer<'a> {
    features: &'a FeatureMatrix,
    returns: &'a [Option<f64>],
    config: AlphaConfig,
}

impl<'a> AlphaScorer<'a> {
    pub fn new(features: &'a FeatureMatrix, returns: &'a [Option<f64>]) -> Result<Self> {
        Self::with_config(features, returns, AlphaConfig::default())
    }

    /// Create a scorer; `returns` must share the matrix's row count
    pub fn with_config(
        features: &'a FeatureMatrix,
        returns: &'a [Option<f64>],
        config: AlphaConfig,
    ) -> Result<Self> {
        if returns.len() != features.n_rows() {
            return Err(AnalyticsError::DataError(format!(
                "Return series has {} rows, feature matrix has {}",
                returns.len(),
                features.n_rows()
            )));
        }
        Ok(Self {
            features,
            returns,
            config,
        })
    }

    /// Pearson correlation of each feature with the returns.
    ///
    /// Features with no present value are skipped; an undefined correlation
    /// (constant feature, too few overlapping rows) is reported as 0.
    pub fn feature_correlations(&self) -> Vec<(String, f64)> {
        self.features
            .iter()
            .filter(|(_, series)| present_count(series) > 0)
            .map(|(name, series)| {
                let corr = pearson(series, self.returns).unwrap_or(0.0);
                (name.to_string(), corr)
            })
            .collect()
    }

    /// Correlation-weighted sum of standardized features.
    ///
    /// Each feature is standardized over its present values; missing entries
    /// contribute zero. With every correlation zero the score is zero on
    /// every row.
    pub fn composite_score(&self) -> Series {
        let n = self.features.n_rows();
        let correlations = self.feature_correlations();
        let total: f64 = correlations.iter().map(|(_, c)| c.abs()).sum();

        let mut score = vec![0.0; n];
        if total > 0.0 {
            for (name, corr) in &correlations {
                let weight = corr.abs() / total;
                if weight == 0.0 {
                    continue;
                }
                let series = match self.features.get(name) {
                    Some(s) => s,
                    None => continue,
                };
                let values = present_values(series);
                let (m, s) = match (mean(&values), population_std(&values)) {
                    (Some(m), Some(s)) if s > 0.0 => (m, s),
                    _ => continue,
                };
                for (acc, v) in score.iter_mut().zip(series) {
                    if let Some(v) = v {
                        *acc += weight * (v - m) / s;
                    }
                }
            }
        } else {
            log::warn!("All feature correlations are zero; composite score is flat");
        }

        score.into_iter().map(Some).collect()
    }

    /// Threshold signals over the composite score
    pub fn signals(&self, threshold: f64) -> Result<SignalSet> {
        SignalSet::from_scores(&self.composite_score(), threshold)
    }

    /// Conditional mean returns under the configured signal threshold.
    ///
    /// Rows without a signal, or whose return is missing, are excluded.
    pub fn backtest(&self) -> Result<BacktestReport> {
        let signals = self.signals(self.config.signal_threshold)?;

        let long: Vec<f64> = self
            .returns
            .iter()
            .zip(&signals.buy)
            .filter(|(_, buy)| **buy)
            .filter_map(|(r, _)| *r)
            .collect();
        let short: Vec<f64> = self
            .returns
            .iter()
            .zip(&signals.sell)
            .filter(|(_, sell)| **sell)
            .filter_map(|(r, _)| r.map(|v| -v))
            .collect();

        log::info!(
            "Backtest: {} long rows, {} short rows",
            long.len(),
            short.len()
        );
        Ok(BacktestReport {
            long_return: mean(&long),
            short_return: mean(&short),
            long_count: long.len(),
            short_count: short.len(),
        })
    }
}
