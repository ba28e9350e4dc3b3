//! Asynchronous trade-execution wrapper
//!
//! A thin consumer of the pipeline: it turns the latest signal into a
//! simulated trade, tracks signed positions per symbol, and runs portfolio
//! rebalancing on a blocking worker bounded by a timeout.

use crate::alpha::SignalSet;
use crate::error::{AnalyticsError, Result};
use crate::portfolio::{OptimizationResult, PortfolioOptimizer, SolverStatus};
use crate::types::{Quantity, Timestamp};
use chrono::Utc;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default notional capital of the bot
pub const DEFAULT_PORTFOLIO_SIZE: f64 = 100_000.0;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    fn sign(&self) -> f64 {
        match self {
            TradeAction::Buy => 1.0,
            TradeAction::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Filled,
}

/// Record of a simulated execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub id: Uuid,
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: Quantity,
    pub status: TradeStatus,
    pub timestamp: Timestamp,
}

/// Signal-driven trading bot with simulated fills
#[derive(Debug)]
pub struct AlphaTradingBot {
    portfolio_size: f64,
    positions: RwLock<HashMap<String, Quantity>>,
}

impl Default for AlphaTradingBot {
    fn default() -> Self {
        Self::new(DEFAULT_PORTFOLIO_SIZE)
    }
}

impl AlphaTradingBot {
    pub fn new(portfolio_size: f64) -> Self {
        Self {
            portfolio_size,
            positions: RwLock::new(HashMap::new()),
        }
    }

    pub fn portfolio_size(&self) -> f64 {
        self.portfolio_size
    }

    /// Record a trade and its signed position delta
    pub async fn execute_trade(
        &self,
        symbol: &str,
        action: TradeAction,
        quantity: Quantity,
    ) -> Result<TradeReceipt> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "trade quantity must be positive, got {}",
                quantity
            )));
        }

        log::info!("Executing {} {} units of {}", action, quantity, symbol);
        {
            let mut positions = self.positions.write().await;
            *positions.entry(symbol.to_string()).or_insert(0.0) += action.sign() * quantity;
        }

        Ok(TradeReceipt {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            action,
            quantity,
            status: TradeStatus::Filled,
            timestamp: Utc::now(),
        })
    }

    /// Trade on the latest row's signal, if it has one
    pub async fn act_on_signals(
        &self,
        symbol: &str,
        signals: &SignalSet,
        quantity: Quantity,
    ) -> Result<Option<TradeReceipt>> {
        let last = match signals.len().checked_sub(1) {
            Some(i) => i,
            None => return Ok(None),
        };
        let action = if signals.buy[last] {
            TradeAction::Buy
        } else if signals.sell[last] {
            TradeAction::Sell
        } else {
            log::debug!("No signal on the latest row for {}", symbol);
            return Ok(None);
        };
        self.execute_trade(symbol, action, quantity).await.map(Some)
    }

    /// Run the optimizer on a blocking worker.
    ///
    /// When `timeout` elapses first the solve is cancelled and a `TimedOut`
    /// result holding the equal-weight seed is returned.
    pub async fn rebalance(
        &self,
        optimizer: Arc<PortfolioOptimizer>,
        target_return: Option<f64>,
        timeout: Duration,
    ) -> Result<OptimizationResult> {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let worker_optimizer = Arc::clone(&optimizer);

        let handle = tokio::task::spawn_blocking(move || {
            worker_optimizer.optimize_with_cancel(target_return, &worker_cancel)
        });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(AnalyticsError::OptimizationFailure(format!(
                "solver task failed: {}",
                e
            ))),
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                log::warn!("Rebalance timed out after {:?}", timeout);
                let mut fallback = optimizer.equal_weight();
                fallback.status = SolverStatus::TimedOut;
                fallback.message = format!("rebalance timed out after {:?}", timeout);
                Ok(fallback)
            }
        }
    }

    /// Snapshot of signed positions per symbol
    pub async fn positions(&self) -> HashMap<String, Quantity> {
        self.positions.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[tokio::test]
    async fn test_execute_trade_updates_positions() {
        let bot = AlphaTradingBot::default();
        let receipt = bot.execute_trade("AAPL", TradeAction::Buy, 10.0).await.unwrap();
        assert_eq!(receipt.status, TradeStatus::Filled);
        assert_eq!(receipt.symbol, "AAPL");

        bot.execute_trade("AAPL", TradeAction::Sell, 4.0).await.unwrap();
        bot.execute_trade("MSFT", TradeAction::Sell, 2.0).await.unwrap();

        let positions = bot.positions().await;
        assert_eq!(positions["AAPL"], 6.0);
        assert_eq!(positions["MSFT"], -2.0);
        assert!(bot.execute_trade("AAPL", TradeAction::Buy, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn test_act_on_latest_signal() {
        let bot = AlphaTradingBot::new(50_000.0);
        let signals = SignalSet {
            buy: vec![true, false],
            sell: vec![false, true],
        };
        let receipt = bot.act_on_signals("SPY", &signals, 5.0).await.unwrap().unwrap();
        assert_eq!(receipt.action, TradeAction::Sell);

        let quiet = SignalSet {
            buy: vec![true, false],
            sell: vec![false, false],
        };
        assert!(bot.act_on_signals("SPY", &quiet, 5.0).await.unwrap().is_none());
        assert_eq!(bot.positions().await["SPY"], -5.0);
    }

    fn random_optimizer(assets: usize, periods: usize) -> PortfolioOptimizer {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let columns: Vec<(String, Vec<f64>)> = (0..assets)
            .map(|a| {
                let drift = 0.0002 * a as f64;
                let returns: Vec<f64> = (0..periods)
                    .map(|_| drift + rng.gen_range(-0.02..0.02))
                    .collect();
                (format!("A{}", a), returns)
            })
            .collect();
        PortfolioOptimizer::new(columns, OptimizerConfig::default()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rebalance_completes() {
        let bot = AlphaTradingBot::default();
        let optimizer = Arc::new(random_optimizer(4, 120));
        let result = bot
            .rebalance(optimizer, None, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(result.success, "{}", result.message);
        assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rebalance_times_out() {
        let bot = AlphaTradingBot::default();
        let optimizer = Arc::new(random_optimizer(200, 300));
        let result = bot
            .rebalance(Arc::clone(&optimizer), None, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(result.status, SolverStatus::TimedOut);
        assert!(!result.success);
        assert_eq!(result.weights, optimizer.equal_weight().weights);
    }
}
