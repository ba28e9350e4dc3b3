//! Property-based checks of indicator bounds, outlier fences and allocation
//! constraints

use alpha_discovery::config::OptimizerConfig;
use alpha_discovery::data::Dataset;
use alpha_discovery::indicators::rolling::RSI;
use alpha_discovery::portfolio::PortfolioOptimizer;
use alpha_discovery::profiler::{OutlierMethod, Profiler};
use alpha_discovery::stats::{quantile_sorted, sorted};
use proptest::prelude::*;

fn return_matrix() -> impl Strategy<Value = Vec<(String, Vec<f64>)>> {
    (2usize..5, 8usize..40).prop_flat_map(|(assets, periods)| {
        prop::collection::vec(
            prop::collection::vec(-0.05f64..0.05, periods),
            assets,
        )
        .prop_map(|columns: Vec<Vec<f64>>| -> Vec<(String, Vec<f64>)> {
            columns
                .into_iter()
                .enumerate()
                .map(|(i, c)| (format!("a{}", i), c))
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rsi_stays_in_range(prices in prop::collection::vec(1.0f64..500.0, 1..120)) {
        let series: Vec<Option<f64>> = prices.into_iter().map(Some).collect();
        for value in RSI::compute(14, &series).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn iqr_flags_exactly_points_outside_fences(
        values in prop::collection::vec(-100.0f64..100.0, 4..60)
    ) {
        let ds = Dataset::from_numeric_columns(vec![("x", values.clone())]).unwrap();
        let report = Profiler::default().detect_outliers(&ds, OutlierMethod::Iqr);
        let flagged = report.outliers.get("x").cloned().unwrap_or_default();

        let s = sorted(&values);
        let q1 = quantile_sorted(&s, 0.25).unwrap();
        let q3 = quantile_sorted(&s, 0.75).unwrap();
        let iqr = q3 - q1;
        let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        for (i, v) in values.iter().enumerate() {
            let outside = *v < lower || *v > upper;
            prop_assert_eq!(flagged.contains(&i), outside);
        }
    }

    #[test]
    fn optimizer_weights_stay_on_simplex(columns in return_matrix()) {
        let optimizer = PortfolioOptimizer::new(columns, OptimizerConfig::default()).unwrap();
        let result = optimizer.optimize(None);

        let sum: f64 = result.weights.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
        for w in &result.weights {
            prop_assert!(*w >= -1e-9 && *w <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn optimizer_never_worse_than_equal_weight(columns in return_matrix()) {
        let optimizer = PortfolioOptimizer::new(columns, OptimizerConfig::default()).unwrap();
        let result = optimizer.optimize(None);
        let baseline = optimizer.equal_weight();
        prop_assert!(result.stats.ratio >= baseline.stats.ratio - 1e-9);
    }
}
