//! Descriptive statistics over slices and aligned series
//!
//! Sample statistics use the `n - 1` denominator; quantiles use linear
//! interpolation between closest ranks.

use crate::types::{finite, Series};
use statrs::statistics::{Data, Distribution};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Data::new(values.to_vec()).mean().and_then(finite)
}

/// Sample standard deviation, `None` with fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec()).std_dev().and_then(finite)
}

/// Population standard deviation (divides by `n`)
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    finite(variance.sqrt())
}

/// Quantile of an ascending-sorted slice, `q` in `[0, 1]`
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Ascending copy of the values
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Sample covariance of two equal-length slices
pub fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let cov = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi - mx) * (yi - my))
        .sum::<f64>()
        / (x.len() - 1) as f64;
    finite(cov)
}

/// Pearson correlation over rows where both series are present.
///
/// `None` when fewer than two complete pairs exist or either side has zero
/// variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();

    let cov = covariance(&xs, &ys)?;
    let sx = sample_std(&xs)?;
    let sy = sample_std(&ys)?;
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    finite((cov / (sx * sy)).clamp(-1.0, 1.0))
}

/// Apply `f` over each trailing window of `window` entries.
///
/// A position is `None` until the window is full, and whenever any entry in
/// its window is missing.
pub fn rolling<F>(series: &[Option<f64>], window: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; series.len()];
    if window == 0 || window > series.len() {
        return out;
    }
    let mut buf = Vec::with_capacity(window);
    for end in window..=series.len() {
        buf.clear();
        buf.extend(series[end - window..end].iter().map_while(|v| *v));
        if buf.len() == window {
            out[end - 1] = f(&buf);
        }
    }
    out
}

/// Rolling arithmetic mean
pub fn rolling_mean(series: &[Option<f64>], window: usize) -> Series {
    rolling(series, window, mean)
}

/// Rolling sample standard deviation
pub fn rolling_std(series: &[Option<f64>], window: usize) -> Series {
    rolling(series, window, sample_std)
}

/// Element-wise ratio, missing where either side is missing or the
/// denominator is zero
pub fn safe_ratio(numerator: &[Option<f64>], denominator: &[Option<f64>]) -> Series {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) if *d != 0.0 => finite(n / d),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&v).unwrap(), 5.0);
        assert_relative_eq!(population_std(&v).unwrap(), 2.0);
        assert_relative_eq!(sample_std(&v).unwrap(), 2.138089935299395, epsilon = 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_quantile_linear() {
        let v = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert_relative_eq!(quantile_sorted(&v, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile_sorted(&v, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile_sorted(&v, 0.75).unwrap(), 3.25);
        assert_relative_eq!(quantile_sorted(&v, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn test_pearson() {
        let x: Series = vec![Some(1.0), Some(2.0), Some(3.0), None];
        let y: Series = vec![Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);

        let flat: Series = vec![Some(1.0); 4];
        assert_eq!(pearson(&flat, &y), None);
    }

    #[test]
    fn test_rolling_mean_warmup_and_gaps() {
        let s: Series = vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)];
        let out = rolling_mean(&s, 2);
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), None, None, Some(5.5)]);
    }

    #[test]
    fn test_rolling_longer_than_series() {
        let s: Series = vec![Some(1.0); 3];
        assert!(rolling_std(&s, 5).iter().all(Option::is_none));
    }

    #[test]
    fn test_safe_ratio() {
        let n: Series = vec![Some(1.0), Some(1.0), None];
        let d: Series = vec![Some(2.0), Some(0.0), Some(1.0)];
        assert_eq!(safe_ratio(&n, &d), vec![Some(0.5), None, None]);
    }
}
