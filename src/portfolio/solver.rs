//! Constrained solvers on the probability simplex
//!
//! Both objectives are solved by projected gradient steps with Armijo
//! backtracking. Every iterate is projected back onto
//! `{w : w_i >= 0, sum w = 1}`, so an interrupted solve still holds a valid
//! allocation.

use crate::constants::ZERO_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Stationary point reached within tolerance
    Converged,
    /// Iteration budget exhausted
    MaxIterations,
    /// Wall-clock budget exhausted
    TimedOut,
    /// Cancellation flag raised by the caller
    Cancelled,
    /// No allocation satisfies the constraints
    Infeasible,
    /// Inputs admit no meaningful optimum (zero or non-finite risk)
    Degenerate,
    /// Seed allocation handed out without running a solve
    NotSolved,
}

impl SolverStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Converged)
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolverStatus::Converged => "converged",
            SolverStatus::MaxIterations => "iteration limit reached",
            SolverStatus::TimedOut => "time budget exhausted",
            SolverStatus::Cancelled => "cancelled",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Degenerate => "degenerate input",
            SolverStatus::NotSolved => "not solved",
        };
        write!(f, "{}", s)
    }
}

/// Iteration, time and cancellation limits shared by a solve
pub(crate) struct Budget<'a> {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub deadline: Option<Instant>,
    pub cancel: Option<&'a AtomicBool>,
}

impl Budget<'_> {
    fn interrupted(&self) -> Option<SolverStatus> {
        if self.cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
            return Some(SolverStatus::Cancelled);
        }
        if self.deadline.map_or(false, |d| Instant::now() >= d) {
            return Some(SolverStatus::TimedOut);
        }
        None
    }
}

/// Raw solver output
#[derive(Debug, Clone)]
pub(crate) struct Solution {
    pub weights: Vec<f64>,
    pub status: SolverStatus,
    pub iterations: usize,
}

/// Euclidean projection onto the probability simplex (sort-based)
pub fn project_simplex(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n == 0 {
        return Vec::new();
    }
    let mut u = v.to_vec();
    u.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (j, &uj) in u.iter().enumerate() {
        cumulative += uj;
        let t = (cumulative - 1.0) / (j + 1) as f64;
        if uj - t > 0.0 {
            theta = t;
        }
    }

    let mut w: Vec<f64> = v.iter().map(|&x| (x - theta).max(0.0)).collect();
    // absorb rounding so the weights sum to one
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for x in &mut w {
            *x /= sum;
        }
    } else {
        w = vec![1.0 / n as f64; n];
    }
    w
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, v)).collect()
}

/// Objective to minimise over the simplex
trait Objective {
    fn value(&self, w: &[f64]) -> f64;
    fn gradient(&self, w: &[f64]) -> Vec<f64>;
}

/// Negated return-to-volatility ratio
struct NegativeRatio<'a> {
    mean: &'a [f64],
    cov: &'a [Vec<f64>],
}

impl Objective for NegativeRatio<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        let variance = dot(w, &mat_vec(self.cov, w));
        if variance <= ZERO_TOLERANCE * ZERO_TOLERANCE {
            return 0.0;
        }
        -dot(w, self.mean) / variance.sqrt()
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let sigma_w = mat_vec(self.cov, w);
        let variance = dot(w, &sigma_w);
        if variance <= ZERO_TOLERANCE * ZERO_TOLERANCE {
            // riskless point: push toward higher return
            return self.mean.iter().map(|m| -m).collect();
        }
        let vol = variance.sqrt();
        let ret = dot(w, self.mean);
        self.mean
            .iter()
            .zip(&sigma_w)
            .map(|(m, s)| -(m / vol - ret * s / (vol * variance)))
            .collect()
    }
}

/// Augmented Lagrangian of variance under a scaled return constraint
struct PenalizedVariance<'a> {
    mean: &'a [f64],
    cov: &'a [Vec<f64>],
    target: f64,
    risk_scale: f64,
    return_scale: f64,
    lambda: f64,
    rho: f64,
}

impl PenalizedVariance<'_> {
    fn violation(&self, w: &[f64]) -> f64 {
        (dot(w, self.mean) - self.target) / self.return_scale
    }
}

impl Objective for PenalizedVariance<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        let c = self.violation(w);
        dot(w, &mat_vec(self.cov, w)) / self.risk_scale + self.lambda * c + 0.5 * self.rho * c * c
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let c = self.violation(w);
        let multiplier = (self.lambda + self.rho * c) / self.return_scale;
        mat_vec(self.cov, w)
            .iter()
            .zip(self.mean)
            .map(|(s, m)| 2.0 * s / self.risk_scale + multiplier * m)
            .collect()
    }
}

/// Projected gradient descent from `start`.
///
/// Returns the final iterate, the status and the iterations consumed.
fn descend<O: Objective>(
    objective: &O,
    start: Vec<f64>,
    budget: &Budget<'_>,
) -> (Vec<f64>, SolverStatus, usize) {
    const ARMIJO: f64 = 1e-4;
    const MIN_STEP: f64 = 1e-20;
    const MAX_STEP: f64 = 1e8;

    let mut w = start;
    let mut f = objective.value(&w);
    let mut step = 1.0;

    for iteration in 1..=budget.max_iterations {
        if let Some(status) = budget.interrupted() {
            return (w, status, iteration - 1);
        }

        let grad = objective.gradient(&w);
        if grad.iter().any(|g| !g.is_finite()) {
            return (w, SolverStatus::Degenerate, iteration);
        }

        let mut accepted = None;
        while step >= MIN_STEP {
            let trial: Vec<f64> = w.iter().zip(&grad).map(|(x, g)| x - step * g).collect();
            let candidate = project_simplex(&trial);
            let decrease: f64 = grad
                .iter()
                .zip(candidate.iter().zip(&w))
                .map(|(g, (c, x))| g * (c - x))
                .sum();
            let f_candidate = objective.value(&candidate);
            if f_candidate <= f + ARMIJO * decrease && f_candidate <= f {
                accepted = Some((candidate, f_candidate));
                break;
            }
            step *= 0.5;
        }

        let (candidate, f_candidate) = match accepted {
            Some(found) => found,
            // no descent direction left
            None => return (w, SolverStatus::Converged, iteration),
        };

        let moved = candidate
            .iter()
            .zip(&w)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        let improvement = f - f_candidate;
        w = candidate;
        f = f_candidate;

        if moved <= ZERO_TOLERANCE || improvement <= budget.tolerance * (1.0 + f.abs()) {
            return (w, SolverStatus::Converged, iteration);
        }
        step = (step * 2.0).min(MAX_STEP);
    }

    (w, SolverStatus::MaxIterations, budget.max_iterations)
}

fn equal_weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

fn has_risk(cov: &[Vec<f64>]) -> bool {
    cov.iter()
        .enumerate()
        .any(|(i, row)| row.get(i).map_or(false, |v| *v > ZERO_TOLERANCE))
}

/// Maximise `w·mean / sqrt(w' cov w)` over the simplex, seeded at equal
/// weights. The ratio never ends below the seed's.
pub(crate) fn max_ratio(mean: &[f64], cov: &[Vec<f64>], budget: &Budget<'_>) -> Solution {
    let n = mean.len();
    if n == 1 {
        return Solution {
            weights: vec![1.0],
            status: SolverStatus::Converged,
            iterations: 0,
        };
    }
    if !has_risk(cov) {
        return Solution {
            weights: equal_weights(n),
            status: SolverStatus::Degenerate,
            iterations: 0,
        };
    }

    let objective = NegativeRatio { mean, cov };
    let (weights, status, iterations) = descend(&objective, equal_weights(n), budget);
    Solution {
        weights,
        status,
        iterations,
    }
}

/// Minimise variance over the simplex subject to `w·mean = target`.
///
/// Targets outside `[min mean, max mean]` are infeasible.
pub(crate) fn min_variance_at(
    mean: &[f64],
    cov: &[Vec<f64>],
    target: f64,
    budget: &Budget<'_>,
) -> Solution {
    const MAX_OUTER: usize = 50;
    const FEASIBILITY: f64 = 1e-8;

    let n = mean.len();
    let lo = mean.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = mean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let return_scale = mean.iter().map(|m| m.abs()).fold(0.0, f64::max).max(ZERO_TOLERANCE);
    let slack = FEASIBILITY * return_scale;

    if !target.is_finite() || target < lo - slack || target > hi + slack {
        return Solution {
            weights: equal_weights(n),
            status: SolverStatus::Infeasible,
            iterations: 0,
        };
    }
    if n == 1 {
        return Solution {
            weights: vec![1.0],
            status: SolverStatus::Converged,
            iterations: 0,
        };
    }

    let risk_scale = cov
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.get(i).copied())
        .fold(0.0, f64::max);
    let mut objective = PenalizedVariance {
        mean,
        cov,
        target,
        risk_scale: if risk_scale > ZERO_TOLERANCE { risk_scale } else { 1.0 },
        return_scale,
        lambda: 0.0,
        rho: 10.0,
    };

    let mut w = equal_weights(n);
    let mut iterations = 0;
    let mut last_violation = f64::INFINITY;

    for _ in 0..MAX_OUTER {
        let (next, status, used) = descend(&objective, w, budget);
        w = next;
        iterations += used;

        match status {
            SolverStatus::Converged | SolverStatus::MaxIterations => {}
            other => {
                return Solution {
                    weights: w,
                    status: other,
                    iterations,
                }
            }
        }

        let violation = objective.violation(&w);
        if violation.abs() <= FEASIBILITY && status == SolverStatus::Converged {
            return Solution {
                weights: w,
                status: SolverStatus::Converged,
                iterations,
            };
        }

        objective.lambda += objective.rho * violation;
        if violation.abs() > 0.25 * last_violation {
            objective.rho = (objective.rho * 10.0).min(1e10);
        }
        last_violation = violation.abs();
    }

    Solution {
        weights: w,
        status: SolverStatus::MaxIterations,
        iterations,
    }
}
