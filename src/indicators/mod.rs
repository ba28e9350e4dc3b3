//! Market indicator engine
//!
//! Derives returns, rolling volatility, moving averages, RSI, regime
//! classification and support/resistance from an OHLCV-shaped dataset. Every
//! operation returns a freshly built value; nothing is cached on the engine.

pub mod rolling;

use crate::config::MarketConfig;
use crate::data::Dataset;
use crate::error::{AnalyticsError, Result};
use crate::frame::IndicatorSet;
use crate::performance::{max_drawdown, sharpe_ratio, MarketSummary};
use crate::stats::{mean, rolling_mean, rolling_std, sample_std};
use crate::types::{last_present, present_values, Series};
use rolling::{PercentChange, RSI};
use serde::{Deserialize, Serialize};

/// Name of the required price column
pub const CLOSE_COLUMN: &str = "close";

/// Name of the optional volume column
pub const VOLUME_COLUMN: &str = "volume";

/// Trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
}

/// Volatility regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    High,
    Normal,
}

/// Current market regime; `None` fields lacked enough history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReport {
    pub trend: Option<Trend>,
    pub volatility_regime: Option<VolatilityRegime>,
    pub current_volatility: Option<f64>,
    pub average_volatility: Option<f64>,
}

/// Price range over the most recent window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
    pub range: f64,
}

/// Indicator engine over a dataset's `close` column
#[derive(Debug, Clone)]
pub struct IndicatorEngine<'a> {
    close: &'a [Option<f64>],
    config: MarketConfig,
}

fn require_window(name: &str, window: usize) -> Result<()> {
    if window == 0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "{} window must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl<'a> IndicatorEngine<'a> {
    /// Create an engine with default market settings
    pub fn new(dataset: &'a Dataset) -> Result<Self> {
        Self::with_config(dataset, MarketConfig::default())
    }

    /// Create an engine; the dataset must be non-empty with a numeric `close`
    pub fn with_config(dataset: &'a Dataset, config: MarketConfig) -> Result<Self> {
        dataset.require_rows()?;
        let close = dataset.numeric(CLOSE_COLUMN)?;
        log::debug!("Indicator engine over {} rows", close.len());
        Ok(Self { close, config })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Percentage change of `close` over `window` steps
    pub fn returns(&self, window: usize) -> Result<Series> {
        require_window("returns", window)?;
        Ok(PercentChange::compute(window, self.close))
    }

    /// Rolling standard deviation of one-step returns, annualized
    pub fn volatility(&self, window: usize) -> Result<Series> {
        require_window("volatility", window)?;
        let returns = PercentChange::compute(1, self.close);
        let factor = self.config.annualization_factor();
        Ok(rolling_std(&returns, window)
            .into_iter()
            .map(|v| v.map(|s| s * factor))
            .collect())
    }

    /// Rolling arithmetic mean of `close`
    pub fn sma(&self, window: usize) -> Result<Series> {
        require_window("sma", window)?;
        Ok(rolling_mean(self.close, window))
    }

    /// Relative Strength Index of `close`
    pub fn rsi(&self, window: usize) -> Result<Series> {
        require_window("rsi", window)?;
        Ok(RSI::compute(window, self.close))
    }

    /// Classify the current trend and volatility regime
    pub fn regime(&self) -> Result<RegimeReport> {
        let sma_fast = self.sma(self.config.sma_fast)?;
        let sma_slow = self.sma(self.config.sma_slow)?;
        let volatility = self.volatility(self.config.volatility_window)?;

        let current_price = last_present(self.close);
        let trend = match (current_price, last_present(&sma_fast), last_present(&sma_slow)) {
            (Some(price), Some(fast), Some(slow)) => {
                if price > fast && fast > slow {
                    Some(Trend::Uptrend)
                } else {
                    Some(Trend::Downtrend)
                }
            }
            _ => {
                log::debug!(
                    "Trend undefined: {} rows, slow SMA needs {}",
                    self.close.len(),
                    self.config.sma_slow
                );
                None
            }
        };

        let current_volatility = last_present(&volatility);
        let average_volatility = mean(&present_values(&volatility));
        let volatility_regime = match (current_volatility, average_volatility) {
            (Some(current), Some(avg)) => {
                if current > avg * self.config.high_volatility_multiplier {
                    Some(VolatilityRegime::High)
                } else {
                    Some(VolatilityRegime::Normal)
                }
            }
            _ => None,
        };

        Ok(RegimeReport {
            trend,
            volatility_regime,
            current_volatility,
            average_volatility,
        })
    }

    /// Support and resistance from the most recent `window` closes.
    ///
    /// `None` when that window holds no present price.
    pub fn support_resistance(&self, window: usize) -> Result<Option<SupportResistance>> {
        require_window("support/resistance", window)?;
        let start = self.close.len().saturating_sub(window);
        let recent = present_values(&self.close[start..]);
        if recent.is_empty() {
            return Ok(None);
        }

        let support = recent.iter().copied().fold(f64::INFINITY, f64::min);
        let resistance = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Some(SupportResistance {
            support,
            resistance,
            range: resistance - support,
        }))
    }

    /// Return, volatility, ratio and drawdown summary
    pub fn summary_statistics(&self) -> Result<MarketSummary> {
        let returns = present_values(&PercentChange::compute(1, self.close));
        let volatility = self.volatility(self.config.volatility_window)?;

        Ok(MarketSummary {
            daily_return_mean: mean(&returns).unwrap_or(0.0),
            daily_return_std: sample_std(&returns).unwrap_or(0.0),
            annual_volatility: last_present(&volatility),
            sharpe_ratio: sharpe_ratio(&returns, self.config.trading_days_per_year),
            max_drawdown: max_drawdown(&present_values(self.close)),
        })
    }

    /// Compute every standard indicator into a fresh set
    pub fn indicators(&self) -> Result<IndicatorSet> {
        let mut set = IndicatorSet::new(self.close.len());
        set.insert("returns", self.returns(1)?)?;
        set.insert("volatility", self.volatility(self.config.volatility_window)?)?;
        set.insert(
            format!("sma_{}", self.config.sma_fast),
            self.sma(self.config.sma_fast)?,
        )?;
        set.insert(
            format!("sma_{}", self.config.sma_slow),
            self.sma(self.config.sma_slow)?,
        )?;
        set.insert("rsi", self.rsi(self.config.rsi_window)?)?;
        Ok(set)
    }
}
