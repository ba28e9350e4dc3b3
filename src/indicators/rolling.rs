//! Streaming price transforms
//!
//! Each transform consumes one observation at a time and yields `None`
//! during its warm-up period or when an input it depends on is missing.

use crate::types::Series;
use std::collections::VecDeque;

/// PercentChange - Percentage change over window
#[derive(Debug, Clone)]
pub struct PercentChange {
    window: usize,
    values: VecDeque<Option<f64>>,
}

impl PercentChange {
    /// Create new PercentChange over `window` steps (must be > 0)
    pub fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window + 1),
        }
    }

    /// Update with new value
    pub fn update(&mut self, value: Option<f64>) -> Option<f64> {
        self.values.push_back(value);

        if self.values.len() > self.window + 1 {
            self.values.pop_front();
        }

        if self.values.len() == self.window + 1 {
            let old_value = (*self.values.front()?)?;
            let new_value = (*self.values.back()?)?;

            if old_value.abs() < f64::EPSILON {
                return None; // Avoid division by zero
            }
            Some((new_value - old_value) / old_value)
        } else {
            None
        }
    }

    /// Compute percentage changes for a whole series
    pub fn compute(window: usize, values: &[Option<f64>]) -> Series {
        let mut pct = Self::new(window);
        values.iter().map(|&v| pct.update(v)).collect()
    }
}

/// Relative Strength Index (RSI)
///
/// Simple (not Wilder-smoothed) averages of gains and losses over `period`
/// one-step deltas.
#[derive(Debug, Clone)]
pub struct RSI {
    period: usize,
    gains: VecDeque<Option<f64>>,
    losses: VecDeque<Option<f64>>,
    prev_value: Option<f64>,
    seen: usize,
}

impl RSI {
    /// Create new RSI with given period (must be > 0)
    pub fn new(period: usize) -> Self {
        Self {
            period,
            gains: VecDeque::with_capacity(period),
            losses: VecDeque::with_capacity(period),
            prev_value: None,
            seen: 0,
        }
    }

    /// Update with new value and compute RSI
    pub fn update(&mut self, value: Option<f64>) -> Option<f64> {
        self.seen += 1;
        let prev = self.prev_value;
        self.prev_value = value;

        if self.seen == 1 {
            return None;
        }

        let change = match (prev, value) {
            (Some(p), Some(v)) => Some(v - p),
            _ => None,
        };
        self.gains.push_back(change.map(|c| c.max(0.0)));
        self.losses.push_back(change.map(|c| (-c).max(0.0)));

        if self.gains.len() > self.period {
            self.gains.pop_front();
            self.losses.pop_front();
        }

        if self.gains.len() < self.period {
            return None;
        }

        let avg_gain = self.gains.iter().copied().sum::<Option<f64>>()? / self.period as f64;
        let avg_loss = self.losses.iter().copied().sum::<Option<f64>>()? / self.period as f64;

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        Some((100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0))
    }

    /// Compute RSI for a whole series
    pub fn compute(period: usize, values: &[Option<f64>]) -> Series {
        let mut rsi = Self::new(period);
        values.iter().map(|&v| rsi.update(v)).collect()
    }
}

/// OBV - On-Balance Volume
///
/// Cumulative sum of volume signed by the one-step price delta. Rows whose
/// delta or volume is missing report `None` but do not reset the total.
#[derive(Debug, Clone, Default)]
pub struct OnBalanceVolume {
    obv: f64,
    prev_close: Option<f64>,
    started: bool,
}

impl OnBalanceVolume {
    /// Create new OBV indicator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with new close price and volume
    pub fn update(&mut self, close: Option<f64>, volume: Option<f64>) -> Option<f64> {
        let prev = self.prev_close;
        let first = !self.started;
        self.started = true;
        self.prev_close = close;

        if first {
            return None;
        }

        let delta = close? - prev?;
        let volume = volume?;
        if delta > 0.0 {
            self.obv += volume;
        } else if delta < 0.0 {
            self.obv -= volume;
        }
        // Zero delta leaves OBV unchanged
        Some(self.obv)
    }

    /// Compute OBV for aligned close and volume series
    pub fn compute(closes: &[Option<f64>], volumes: &[Option<f64>]) -> Series {
        let mut obv = Self::new();
        closes
            .iter()
            .zip(volumes)
            .map(|(&c, &v)| obv.update(c, v))
            .collect()
    }
}
