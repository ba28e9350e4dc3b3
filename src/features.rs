//! Feature engineering for alpha signals
//!
//! Momentum, volatility, mean-reversion and volume features derived from the
//! `close` and `volume` columns. Windows longer than the available history
//! produce all-missing features rather than errors.

use crate::config::FeatureConfig;
use crate::data::Dataset;
use crate::error::{AnalyticsError, Result};
use crate::frame::FeatureMatrix;
use crate::indicators::rolling::{OnBalanceVolume, PercentChange};
use crate::indicators::{CLOSE_COLUMN, VOLUME_COLUMN};
use crate::stats::{rolling_mean, rolling_std, safe_ratio};
use crate::types::Series;

/// Feature engine over a dataset's price and volume columns
#[derive(Debug, Clone)]
pub struct FeatureEngine<'a> {
    close: &'a [Option<f64>],
    volume: Option<&'a [Option<f64>]>,
    config: FeatureConfig,
}

impl<'a> FeatureEngine<'a> {
    /// Create an engine with default windows
    pub fn new(dataset: &'a Dataset) -> Result<Self> {
        Self::with_config(dataset, FeatureConfig::default())
    }

    /// Create an engine; `close` is required, `volume` is optional
    pub fn with_config(dataset: &'a Dataset, config: FeatureConfig) -> Result<Self> {
        dataset.require_rows()?;
        let close = dataset.numeric(CLOSE_COLUMN)?;
        let volume = if dataset.has_column(VOLUME_COLUMN) {
            Some(dataset.numeric(VOLUME_COLUMN)?)
        } else {
            None
        };
        Ok(Self {
            close,
            volume,
            config,
        })
    }

    fn empty(&self) -> FeatureMatrix {
        FeatureMatrix::new(self.close.len())
    }

    /// `momentum_<k>` for each configured k, plus `roc`
    pub fn momentum_features(&self) -> Result<FeatureMatrix> {
        let mut features = self.empty();
        for &k in &self.config.momentum_windows {
            features.insert(format!("momentum_{}", k), PercentChange::compute(k, self.close))?;
        }
        features.insert(
            "roc",
            PercentChange::compute(self.config.roc_horizon, self.close),
        )?;
        Ok(features)
    }

    /// `volatility_<w>` and the short/long `volatility_ratio`
    pub fn volatility_features(&self) -> Result<FeatureMatrix> {
        let returns = PercentChange::compute(1, self.close);
        let short = rolling_std(&returns, self.config.volatility_window);
        let long = rolling_std(&returns, self.config.volatility_long_window);

        let mut features = self.empty();
        features.insert("volatility_ratio", safe_ratio(&short, &long))?;
        features.insert(format!("volatility_{}", self.config.volatility_window), short)?;
        Ok(features)
    }

    /// `distance_to_sma` and price `z_score` against the rolling mean
    pub fn mean_reversion_features(&self) -> Result<FeatureMatrix> {
        let window = self.config.mean_reversion_window;
        let sma = rolling_mean(self.close, window);
        let std = rolling_std(self.close, window);

        let deviation: Series = self
            .close
            .iter()
            .zip(&sma)
            .map(|(c, m)| Some((*c)? - (*m)?))
            .collect();

        let mut features = self.empty();
        features.insert("distance_to_sma", safe_ratio(&deviation, &sma))?;
        features.insert("z_score", safe_ratio(&deviation, &std))?;
        Ok(features)
    }

    /// `volume_sma_ratio` and `on_balance_volume`; requires a `volume` column
    pub fn volume_features(&self) -> Result<FeatureMatrix> {
        let volume = self
            .volume
            .ok_or_else(|| AnalyticsError::ColumnNotFound(VOLUME_COLUMN.to_string()))?;

        let volume_mean = rolling_mean(volume, self.config.volume_window);
        let mut features = self.empty();
        features.insert("volume_sma_ratio", safe_ratio(volume, &volume_mean))?;
        features.insert(
            "on_balance_volume",
            OnBalanceVolume::compute(self.close, volume),
        )?;
        Ok(features)
    }

    /// Every feature group in one matrix.
    ///
    /// The volume group is skipped when the dataset has no `volume` column.
    pub fn compute_all(&self) -> Result<FeatureMatrix> {
        let mut features = self.empty();
        features.extend(self.momentum_features()?)?;
        features.extend(self.volatility_features()?)?;
        features.extend(self.mean_reversion_features()?)?;
        if self.volume.is_some() {
            features.extend(self.volume_features()?)?;
        } else {
            log::warn!("No '{}' column; volume features skipped", VOLUME_COLUMN);
        }

        log::info!("Created {} features", features.len());
        Ok(features)
    }
}
