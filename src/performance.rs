//! Performance analytics over return and price paths

use crate::constants::ZERO_TOLERANCE;
use crate::stats::{mean, sample_std};
use serde::{Deserialize, Serialize};

/// Annualized Sharpe-like ratio of a per-period return sample.
///
/// Zero when the standard deviation is zero or undefined.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    match (mean(returns), sample_std(returns)) {
        (Some(m), Some(s)) if s > ZERO_TOLERANCE => m / s * periods_per_year.sqrt(),
        _ => 0.0,
    }
}

/// Maximum peak-to-trough decline of a value path, as a fraction of the peak
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut iter = values.iter().copied().filter(|v| v.is_finite());
    let mut max_value = match iter.next() {
        Some(v) => v,
        None => return 0.0,
    };
    let mut max_dd = 0.0;

    for value in iter {
        if value > max_value {
            max_value = value;
        }

        if max_value > 0.0 {
            let drawdown = (max_value - value) / max_value;
            if drawdown > max_dd {
                max_dd = drawdown;
            }
        }
    }

    max_dd
}

/// Summary of a price series' one-step returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub daily_return_mean: f64,
    pub daily_return_std: f64,
    /// Latest rolling annualized volatility, if the window has filled
    pub annual_volatility: Option<f64>,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl std::fmt::Display for MarketSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Market Summary:")?;
        writeln!(f, "  Mean Daily Return:  {:.4}%", self.daily_return_mean * 100.0)?;
        writeln!(f, "  Daily Return Std:   {:.4}%", self.daily_return_std * 100.0)?;
        match self.annual_volatility {
            Some(v) => writeln!(f, "  Annual Volatility:  {:.2}%", v * 100.0)?,
            None => writeln!(f, "  Annual Volatility:  n/a")?,
        }
        writeln!(f, "  Sharpe Ratio:       {:.2}", self.sharpe_ratio)?;
        writeln!(f, "  Max Drawdown:       {:.2}%", self.max_drawdown * 100.0)?;
        Ok(())
    }
}
