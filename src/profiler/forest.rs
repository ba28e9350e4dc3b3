//! Random forest regressor
//!
//! Bootstrap-aggregated regression trees with mean-squared-error splits.
//! Only what the profiler needs: fitting, prediction and impurity-decrease
//! feature importances.

use crate::config::ProfilerConfig;
use crate::error::{AnalyticsError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::from(&ProfilerConfig::default())
    }
}

impl From<&ProfilerConfig> for ForestConfig {
    fn from(config: &ProfilerConfig) -> Self {
        Self {
            n_trees: config.forest_trees,
            max_depth: config.forest_max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: config.forest_seed,
        }
    }
}

// Only prediction walks the tree shape
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Single regression tree
#[derive(Debug, Clone)]
struct RegressionTree {
    #[cfg_attr(not(test), allow(dead_code))]
    root: Node,
    importances: Vec<f64>,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a ForestConfig,
    rng: ChaCha8Rng,
    importances: Vec<f64>,
}

fn mean_of(y: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn mse_of(y: &[f64], indices: &[usize], mean: f64) -> f64 {
    indices.iter().map(|&i| (y[i] - mean).powi(2)).sum::<f64>() / indices.len() as f64
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: &[usize], depth: usize) -> Node {
        let n = indices.len();
        let value = mean_of(self.y, indices);
        let impurity = mse_of(self.y, indices, value);

        if depth >= self.config.max_depth || n < self.config.min_samples_split || impurity < 1e-10
        {
            return Node::Leaf(value);
        }

        match self.best_split(indices) {
            Some((feature, threshold, gain)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| self.x[i][feature] <= threshold);

                self.importances[feature] += gain;
                let left = self.build(&left_idx, depth + 1);
                let right = self.build(&right_idx, depth + 1);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => Node::Leaf(value),
        }
    }

    /// Best (feature, threshold, weighted impurity decrease) over all features
    fn best_split(&mut self, indices: &[usize]) -> Option<(usize, f64, f64)> {
        let n_features = self.importances.len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let parent_score = total * total / n as f64;
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<(usize, f64, f64)> = None;
        let mut best_gain = 0.0;
        let mut order = indices.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            // Sweep split points; the gain in summed squared error is
            // sum_l^2/n_l + sum_r^2/n_r - sum^2/n
            let mut left_sum = 0.0;
            for split in 1..n {
                left_sum += self.y[order[split - 1]];
                let lo = self.x[order[split - 1]][feature];
                let hi = self.x[order[split]][feature];
                if lo >= hi || split < min_leaf || n - split < min_leaf {
                    continue;
                }
                let n_left = split as f64;
                let n_right = (n - split) as f64;
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left + right_sum * right_sum / n_right
                    - parent_score;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, (lo + hi) / 2.0, gain));
                }
            }
        }

        best
    }
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], config: &ForestConfig, seed: u64) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut builder = TreeBuilder {
            x,
            y,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            importances: vec![0.0; n_features],
        };
        let root = builder.build(indices, 0);

        // Normalize feature importances
        let mut importances = builder.importances;
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }
        Self { root, importances }
    }

    #[cfg(test)]
    fn predict_one(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Train on row-major features `x` and target `y`.
    ///
    /// Fails on empty or ragged input and on non-finite values.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AnalyticsError::DataError(format!(
                "Forest needs aligned, non-empty samples: {} rows, {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(AnalyticsError::DataError(
                "Forest needs at least one feature and rectangular input".to_string(),
            ));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(AnalyticsError::DataError(
                "Forest input contains non-finite values".to_string(),
            ));
        }
        if self.config.n_trees == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "Forest needs at least one tree".to_string(),
            ));
        }

        let n_samples = x.len();
        let config = &self.config;

        // Build trees in parallel
        let trees: Vec<RegressionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let indices: Vec<usize> = if config.bootstrap {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::fit(x, y, &indices, config, seed)
            })
            .collect();

        // Aggregate feature importances
        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (acc, imp) in importances.iter_mut().zip(&tree.importances) {
                *acc += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }

        log::debug!(
            "Fitted {} trees on {} samples x {} features",
            trees.len(),
            n_samples,
            n_features
        );
        self.trees = trees;
        self.feature_importances = importances;
        Ok(())
    }

    /// Mean prediction of all trees
    #[cfg(test)]
    pub(crate) fn predict_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_one(features)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalized importances, one per feature; empty before fitting
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
