//! Long-only portfolio optimizer
//!
//! Builds per-asset mean returns and the sample covariance from a return
//! matrix (rows are periods, columns are assets) and searches the simplex for
//! the allocation with the best return-to-volatility ratio, or the minimum
//! variance at a target return.

pub mod solver;

use crate::config::OptimizerConfig;
use crate::constants::{WEIGHT_TOLERANCE, ZERO_TOLERANCE};
use crate::data::Dataset;
use crate::error::{AnalyticsError, Result};
use crate::stats::{covariance, mean};
use serde::{Deserialize, Serialize};
use solver::{dot, mat_vec, Budget, Solution};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

pub use solver::{project_simplex, SolverStatus};

/// Return, volatility and ratio of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub volatility: f64,
    /// `expected_return / volatility`, 0 when volatility is 0
    pub ratio: f64,
}

/// Weights paired with their stats and the solver outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub assets: Vec<String>,
    pub weights: Vec<f64>,
    pub stats: PortfolioStats,
    pub success: bool,
    pub status: SolverStatus,
    pub iterations: usize,
    pub message: String,
}

impl std::fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Optimization {} after {} iterations", self.status, self.iterations)?;
        for (asset, weight) in self.assets.iter().zip(&self.weights) {
            writeln!(f, "  {:<12} {:>8.2}%", asset, weight * 100.0)?;
        }
        writeln!(f, "  Return:     {:.6}", self.stats.expected_return)?;
        writeln!(f, "  Volatility: {:.6}", self.stats.volatility)?;
        writeln!(f, "  Ratio:      {:.4}", self.stats.ratio)?;
        Ok(())
    }
}

/// Optimizer over a fixed return matrix
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    assets: Vec<String>,
    mean_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    n_observations: usize,
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    /// Create an optimizer from per-asset return columns of equal length.
    ///
    /// Needs at least one asset, two observations and finite values.
    pub fn new(columns: Vec<(String, Vec<f64>)>, config: OptimizerConfig) -> Result<Self> {
        if columns.is_empty() {
            return Err(AnalyticsError::DataError(
                "Return matrix has no assets".to_string(),
            ));
        }
        let n_observations = columns[0].1.len();
        if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != n_observations) {
            return Err(AnalyticsError::DataError(format!(
                "Asset '{}' has a different number of observations",
                name
            )));
        }
        if n_observations < 2 {
            return Err(AnalyticsError::InsufficientHistory {
                required: 2,
                available: n_observations,
            });
        }
        if let Some((name, _)) = columns
            .iter()
            .find(|(_, c)| c.iter().any(|v| !v.is_finite()))
        {
            return Err(AnalyticsError::DataError(format!(
                "Asset '{}' has non-finite returns",
                name
            )));
        }

        let mut mean_returns = Vec::with_capacity(columns.len());
        for (name, c) in &columns {
            let m = mean(c).ok_or_else(|| {
                AnalyticsError::DataError(format!("Asset '{}' mean is undefined", name))
            })?;
            mean_returns.push(m);
        }
        let mut cov = vec![vec![0.0; columns.len()]; columns.len()];
        for i in 0..columns.len() {
            for j in i..columns.len() {
                let c = covariance(&columns[i].1, &columns[j].1).ok_or_else(|| {
                    AnalyticsError::DataError("Covariance is undefined".to_string())
                })?;
                cov[i][j] = c;
                cov[j][i] = c;
            }
        }

        log::debug!(
            "Portfolio optimizer over {} assets x {} observations",
            columns.len(),
            n_observations
        );
        Ok(Self {
            assets: columns.into_iter().map(|(name, _)| name).collect(),
            mean_returns,
            covariance: cov,
            n_observations,
            config,
        })
    }

    /// Use every numeric column of `dataset` as an asset, dropping rows with
    /// any missing value
    pub fn from_dataset(dataset: &Dataset, config: OptimizerConfig) -> Result<Self> {
        let names = dataset.numeric_column_names();
        let series = names
            .iter()
            .map(|n| dataset.numeric(n))
            .collect::<Result<Vec<_>>>()?;

        let complete: Vec<usize> = (0..dataset.n_rows())
            .filter(|&row| series.iter().all(|s| s[row].is_some()))
            .collect();
        if complete.len() < dataset.n_rows() {
            log::info!(
                "Dropped {} incomplete rows from the return matrix",
                dataset.n_rows() - complete.len()
            );
        }

        let columns: Vec<(String, Vec<f64>)> = names
            .iter()
            .zip(&series)
            .map(|(name, s)| {
                let values: Vec<f64> = complete.iter().filter_map(|&row| s[row]).collect();
                (name.to_string(), values)
            })
            .collect();
        Self::new(columns, config)
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn mean_returns(&self) -> &[f64] {
        &self.mean_returns
    }

    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Return, volatility and ratio of `weights`
    pub fn portfolio_stats(&self, weights: &[f64]) -> Result<PortfolioStats> {
        if weights.len() != self.assets.len() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "Expected {} weights, got {}",
                self.assets.len(),
                weights.len()
            )));
        }
        Ok(self.stats_of(weights))
    }

    fn stats_of(&self, weights: &[f64]) -> PortfolioStats {
        let expected_return = dot(weights, &self.mean_returns);
        let variance = dot(weights, &mat_vec(&self.covariance, weights)).max(0.0);
        let volatility = variance.sqrt();
        let ratio = if volatility > ZERO_TOLERANCE {
            expected_return / volatility
        } else {
            0.0
        };
        PortfolioStats {
            expected_return,
            volatility,
            ratio,
        }
    }

    /// The 1/n seed allocation, for callers falling back after a failed solve.
    /// No solve runs, so the result is never marked successful.
    pub fn equal_weight(&self) -> OptimizationResult {
        let n = self.assets.len();
        let weights = vec![1.0 / n as f64; n];
        self.finish(
            Solution {
                weights,
                status: SolverStatus::NotSolved,
                iterations: 0,
            },
            "equal-weight allocation".to_string(),
        )
    }

    /// Maximise the ratio, or with `target_return` minimise variance at that
    /// return
    pub fn optimize(&self, target_return: Option<f64>) -> OptimizationResult {
        let cancel = AtomicBool::new(false);
        self.optimize_with_cancel(target_return, &cancel)
    }

    /// As [`optimize`](Self::optimize), stopping early once `cancel` is set
    pub fn optimize_with_cancel(
        &self,
        target_return: Option<f64>,
        cancel: &AtomicBool,
    ) -> OptimizationResult {
        let started = Instant::now();
        let budget = Budget {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            deadline: self
                .config
                .time_budget_ms
                .map(|ms| started + Duration::from_millis(ms)),
            cancel: Some(cancel),
        };

        let solution = match target_return {
            None => solver::max_ratio(&self.mean_returns, &self.covariance, &budget),
            Some(t) => solver::min_variance_at(&self.mean_returns, &self.covariance, t, &budget),
        };

        let message = match (target_return, solution.status) {
            (Some(t), SolverStatus::Infeasible) => format!(
                "target return {} outside the attainable range of mean returns",
                t
            ),
            (_, status) => format!("{} in {:?}", status, started.elapsed()),
        };
        let result = self.finish(solution, message);

        if result.success {
            log::info!(
                "Optimization converged in {} iterations, ratio {:.4}",
                result.iterations,
                result.stats.ratio
            );
        } else {
            log::warn!("Optimization did not succeed: {}", result.message);
        }
        result
    }

    fn finish(&self, solution: Solution, message: String) -> OptimizationResult {
        let stats = self.stats_of(&solution.weights);
        let sum: f64 = solution.weights.iter().sum();
        let valid = (sum - 1.0).abs() <= WEIGHT_TOLERANCE
            && solution
                .weights
                .iter()
                .all(|w| (-WEIGHT_TOLERANCE..=1.0 + WEIGHT_TOLERANCE).contains(w));

        OptimizationResult {
            assets: self.assets.clone(),
            weights: solution.weights,
            stats,
            success: solution.status.is_success() && valid,
            status: solution.status,
            iterations: solution.iterations,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn returns() -> Vec<(String, Vec<f64>)> {
        vec![
            (
                "A".to_string(),
                vec![0.01, 0.02, -0.01, 0.015, 0.005, 0.012, -0.004, 0.02],
            ),
            (
                "B".to_string(),
                vec![0.005, -0.002, 0.004, 0.001, 0.006, -0.001, 0.003, 0.002],
            ),
            (
                "C".to_string(),
                vec![-0.02, 0.03, 0.01, -0.015, 0.025, -0.01, 0.02, 0.0],
            ),
        ]
    }

    fn optimizer() -> PortfolioOptimizer {
        PortfolioOptimizer::new(returns(), OptimizerConfig::default()).unwrap()
    }

    #[test]
    fn test_portfolio_stats() {
        let opt = PortfolioOptimizer::new(
            vec![
                ("x".to_string(), vec![0.01, 0.03]),
                ("y".to_string(), vec![0.02, 0.02]),
            ],
            OptimizerConfig::default(),
        )
        .unwrap();

        let stats = opt.portfolio_stats(&[0.0, 1.0]).unwrap();
        assert_relative_eq!(stats.expected_return, 0.02);
        assert_eq!(stats.volatility, 0.0);
        assert_eq!(stats.ratio, 0.0);

        let stats = opt.portfolio_stats(&[1.0, 0.0]).unwrap();
        assert_relative_eq!(stats.volatility, 0.0002f64.sqrt(), epsilon = 1e-12);
        assert!(opt.portfolio_stats(&[1.0]).is_err());
    }

    #[test]
    fn test_optimize_beats_equal_weight() {
        let opt = optimizer();
        let seed = opt.equal_weight();
        let result = opt.optimize(None);

        assert!(result.success, "{}", result.message);
        assert_eq!(result.status, SolverStatus::Converged);
        assert_relative_eq!(result.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(result.weights.iter().all(|w| (0.0..=1.0).contains(w)));
        assert!(result.stats.ratio >= seed.stats.ratio - 1e-12);
    }

    #[test]
    fn test_equal_weight_is_not_a_solve() {
        let opt = optimizer();
        let seed = opt.equal_weight();

        assert!(!seed.success);
        assert_eq!(seed.status, SolverStatus::NotSolved);
        assert_eq!(seed.iterations, 0);
        assert_eq!(seed.weights, vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_optimize_with_target() {
        let opt = optimizer();
        let means = opt.mean_returns().to_vec();
        let lo = means.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let target = (lo + hi) / 2.0;

        let result = opt.optimize(Some(target));
        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.stats.expected_return, target, epsilon = 1e-8);

        let infeasible = opt.optimize(Some(hi + 1.0));
        assert!(!infeasible.success);
        assert_eq!(infeasible.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_cancelled_solve_reports_failure() {
        let opt = optimizer();
        let cancel = AtomicBool::new(true);
        let result = opt.optimize_with_cancel(None, &cancel);
        assert!(!result.success);
        assert_eq!(result.status, SolverStatus::Cancelled);
        assert_eq!(result.weights, opt.equal_weight().weights);
    }

    #[test]
    fn test_time_budget() {
        let config = OptimizerConfig {
            time_budget_ms: Some(0),
            ..OptimizerConfig::default()
        };
        let opt = PortfolioOptimizer::new(returns(), config).unwrap();
        let result = opt.optimize(None);
        assert_eq!(result.status, SolverStatus::TimedOut);
        assert!(!result.success);
    }

    #[test]
    fn test_validation() {
        assert!(PortfolioOptimizer::new(vec![], OptimizerConfig::default()).is_err());
        assert!(matches!(
            PortfolioOptimizer::new(
                vec![("a".to_string(), vec![0.1])],
                OptimizerConfig::default()
            ),
            Err(AnalyticsError::InsufficientHistory { .. })
        ));
        assert!(PortfolioOptimizer::new(
            vec![("a".to_string(), vec![0.1, f64::NAN])],
            OptimizerConfig::default()
        )
        .is_err());
    }

    #[test]
    fn test_from_dataset_drops_incomplete_rows() {
        use crate::data::Value;
        let ds = Dataset::from_columns(vec![
            (
                "a".to_string(),
                vec![Value::from(0.01), Value::Missing, Value::from(0.02), Value::from(-0.01)],
            ),
            (
                "b".to_string(),
                vec![Value::from(0.0), Value::from(0.01), Value::from(0.01), Value::from(0.02)],
            ),
        ])
        .unwrap();
        let opt = PortfolioOptimizer::from_dataset(&ds, OptimizerConfig::default()).unwrap();
        assert_eq!(opt.n_observations(), 3);
        assert_eq!(opt.assets(), &["a".to_string(), "b".to_string()]);
        assert_relative_eq!(opt.mean_returns()[1], 0.01, epsilon = 1e-12);
    }
}
