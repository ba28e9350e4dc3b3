//! # alpha_discovery
//!
//! A quantitative analytics pipeline over in-memory tabular data.
//!
//! Stages run in data-dependency order, each returning freshly built values:
//!
//! 1. [`profiler`] - shape, nulls, descriptive statistics, outliers, feature importance
//! 2. [`indicators`] - returns, volatility, moving averages, RSI, regime
//! 3. [`features`] - momentum, volatility, mean-reversion and volume features
//! 4. [`alpha`] - correlation-weighted composite score, signals, backtest
//! 5. [`portfolio`] - long-only allocation on the simplex
//!
//! ## Example
//!
//! ```rust,no_run
//! use alpha_discovery::prelude::*;
//!
//! # fn main() -> alpha_discovery::error::Result<()> {
//! let dataset = read_csv_path(std::path::Path::new("prices.csv"))?;
//!
//! let features = FeatureEngine::new(&dataset)?.compute_all()?;
//! let target = forward_returns(dataset.numeric("close")?, 1)?;
//! let scorer = AlphaScorer::new(&features, &target)?;
//! let signals = scorer.signals(0.5)?;
//! println!("{} buy signals", signals.buy_count());
//! # Ok(())
//! # }
//! ```

pub mod alpha;
#[cfg(feature = "async")]
pub mod bot;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod features;
pub mod frame;
pub mod indicators;
pub mod performance;
pub mod portfolio;
pub mod profiler;
pub mod stats;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::alpha::{forward_returns, AlphaScorer, BacktestReport, SignalSet};
    #[cfg(feature = "async")]
    pub use crate::bot::{AlphaTradingBot, TradeAction, TradeReceipt};
    pub use crate::config::AnalyticsConfig;
    pub use crate::data::ingest::{read_csv, read_csv_path};
    pub use crate::data::{Column, ColumnType, Dataset, Value};
    pub use crate::error::{AnalyticsError, Result};
    pub use crate::features::FeatureEngine;
    pub use crate::frame::{FeatureMatrix, IndicatorSet};
    pub use crate::indicators::IndicatorEngine;
    pub use crate::performance::MarketSummary;
    pub use crate::portfolio::{OptimizationResult, PortfolioOptimizer, PortfolioStats, SolverStatus};
    pub use crate::profiler::{OutlierMethod, Profiler};
    pub use crate::types::*;
}
