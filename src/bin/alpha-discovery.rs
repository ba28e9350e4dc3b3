//! alpha-discovery CLI - Command-line interface for the analytics pipeline
//!
//! Every subcommand reads a CSV file and prints its report as JSON.
//!
//! ## Example Usage
//!
//! ```bash
//! # Dataset shape and types
//! alpha-discovery info prices.csv
//!
//! # Outliers by z-score
//! alpha-discovery outliers prices.csv --method zscore
//!
//! # Composite alpha signals and backtest
//! alpha-discovery alpha prices.csv --threshold 0.5 --horizon 1
//!
//! # Max-ratio allocation over a return matrix
//! alpha-discovery optimize returns.csv
//! ```

use alpha_discovery::alpha::{forward_returns, AlphaScorer};
use alpha_discovery::config::AnalyticsConfig;
use alpha_discovery::data::ingest::{column_listing, read_csv_path};
use alpha_discovery::data::Dataset;
use alpha_discovery::features::FeatureEngine;
use alpha_discovery::indicators::{IndicatorEngine, CLOSE_COLUMN};
use alpha_discovery::portfolio::PortfolioOptimizer;
use alpha_discovery::profiler::{OutlierMethod, Profiler};
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// alpha-discovery: dataset profiling, indicators, features, alpha and allocation
#[derive(Parser)]
#[command(name = "alpha-discovery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Quantitative analytics pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shape, column types and null counts
    Info {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Descriptive statistics of numeric columns
    Describe {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Null counts per column
    Nulls {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Outlier rows per numeric column
    Outliers {
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Detection method: iqr or zscore
        #[arg(short, long, default_value = "iqr")]
        method: OutlierMethod,
    },
    /// Correlation and random-forest feature importance
    Importance {
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Target column (defaults to the first numeric column)
        #[arg(short, long)]
        target: Option<String>,
    },
    /// Market regime, support/resistance and summary statistics
    Market {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Engineered feature matrix
    Features {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Composite alpha score, signals and backtest
    Alpha {
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Signal threshold on the composite score
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Forward-return horizon in rows
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Long-only allocation over a return matrix
    Optimize {
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Minimise variance at this return instead of maximising the ratio
        #[arg(long, allow_negative_numbers = true)]
        target_return: Option<f64>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalyticsConfig> {
    if let Some(config_path) = path {
        return AnalyticsConfig::load(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()));
    }

    // Try default location
    if let Some(config_dir) = dirs::config_dir() {
        let default_config = config_dir.join("alpha-discovery").join("config.toml");
        if default_config.exists() {
            return AnalyticsConfig::load(&default_config)
                .with_context(|| format!("Failed to load config {}", default_config.display()));
        }
    }
    Ok(AnalyticsConfig::default())
}

fn load_dataset(path: &Path, verbose: bool) -> anyhow::Result<Dataset> {
    let dataset =
        read_csv_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if verbose {
        let listing = column_listing(&dataset);
        println!(
            "  {} {} rows, {} numeric / {} categorical columns",
            "Loaded:".bold(),
            dataset.n_rows(),
            listing.numeric_columns.len(),
            listing.categorical_columns.len()
        );
    }
    Ok(dataset)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[derive(Serialize)]
struct MarketReport {
    summary: alpha_discovery::performance::MarketSummary,
    regime: alpha_discovery::indicators::RegimeReport,
    support_resistance: Option<alpha_discovery::indicators::SupportResistance>,
}

#[derive(Serialize)]
struct AlphaReport {
    correlations: Vec<(String, f64)>,
    buy_signals: usize,
    sell_signals: usize,
    backtest: alpha_discovery::alpha::BacktestReport,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let verbose = cli.verbose;
    let profiler = Profiler::new(config.profiler.clone());

    match cli.command {
        Commands::Info { input } => {
            let ds = load_dataset(&input, verbose)?;
            print_json(&profiler.basic_info(&ds))
        }
        Commands::Describe { input } => {
            let ds = load_dataset(&input, verbose)?;
            print_json(&profiler.descriptive_stats(&ds))
        }
        Commands::Nulls { input } => {
            let ds = load_dataset(&input, verbose)?;
            print_json(&profiler.null_summary(&ds))
        }
        Commands::Outliers { input, method } => {
            let ds = load_dataset(&input, verbose)?;
            print_json(&profiler.detect_outliers(&ds, method))
        }
        Commands::Importance { input, target } => {
            let ds = load_dataset(&input, verbose)?;
            let pb = spinner("Fitting random forest...")?;
            let report = profiler.feature_importance(&ds, target.as_deref());
            pb.finish_and_clear();
            print_json(&report)
        }
        Commands::Market { input } => {
            let ds = load_dataset(&input, verbose)?;
            let engine = IndicatorEngine::with_config(&ds, config.market.clone())?;
            let summary = engine.summary_statistics()?;
            if verbose {
                print!("{}", summary);
            }
            print_json(&MarketReport {
                summary,
                regime: engine.regime()?,
                support_resistance: engine
                    .support_resistance(config.market.support_resistance_window)?,
            })
        }
        Commands::Features { input } => {
            let ds = load_dataset(&input, verbose)?;
            let features = FeatureEngine::with_config(&ds, config.features.clone())?.compute_all()?;
            print_json(&features)
        }
        Commands::Alpha {
            input,
            threshold,
            horizon,
        } => {
            let ds = load_dataset(&input, verbose)?;
            let mut alpha_config = config.alpha.clone();
            if let Some(t) = threshold {
                alpha_config.signal_threshold = t;
            }
            let horizon = horizon.unwrap_or(alpha_config.forward_horizon);

            let features = FeatureEngine::with_config(&ds, config.features.clone())?.compute_all()?;
            let target = forward_returns(ds.numeric(CLOSE_COLUMN)?, horizon)?;
            let scorer = AlphaScorer::with_config(&features, &target, alpha_config.clone())?;
            let signals = scorer.signals(alpha_config.signal_threshold)?;
            let backtest = scorer.backtest()?;
            if verbose {
                print!("{}", backtest);
            }
            print_json(&AlphaReport {
                correlations: scorer.feature_correlations(),
                buy_signals: signals.buy_count(),
                sell_signals: signals.sell_count(),
                backtest,
            })
        }
        Commands::Optimize {
            input,
            target_return,
        } => {
            let ds = load_dataset(&input, verbose)?;
            let optimizer = PortfolioOptimizer::from_dataset(&ds, config.optimizer.clone())?;
            let pb = spinner("Optimizing allocation...")?;
            let result = optimizer.optimize(target_return);
            pb.finish_and_clear();

            if result.success {
                eprintln!("{} {}", "✓".green().bold(), result.message);
            } else {
                eprintln!("{} {}", "Warning:".yellow(), result.message);
            }
            if verbose {
                print!("{}", result);
            }
            print_json(&result)
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!(
            "{} v{}",
            "alpha-discovery".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = vec!["alpha-discovery", "info", "prices.csv"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Info { .. }));
    }

    #[test]
    fn test_outliers_method() {
        let args = vec!["alpha-discovery", "outliers", "prices.csv", "--method", "zscore"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Outliers { method, .. } => assert_eq!(method, OutlierMethod::ZScore),
            _ => panic!("expected outliers command"),
        }

        let args = vec!["alpha-discovery", "outliers", "prices.csv", "--method", "median"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_alpha_command() {
        let args = vec![
            "alpha-discovery",
            "--verbose",
            "alpha",
            "prices.csv",
            "--threshold",
            "0.8",
            "--horizon",
            "5",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Alpha {
                threshold, horizon, ..
            } => {
                assert_eq!(threshold, Some(0.8));
                assert_eq!(horizon, Some(5));
            }
            _ => panic!("expected alpha command"),
        }
    }

    #[test]
    fn test_optimize_command() {
        let args = vec!["alpha-discovery", "optimize", "returns.csv", "--target-return", "0.001"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Optimize {
                target_return: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_optimize_negative_target() {
        let args = vec!["alpha-discovery", "optimize", "returns.csv", "--target-return", "-0.001"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Optimize { target_return, .. } => {
                assert_eq!(target_return, Some(-0.001));
            }
            _ => panic!("expected optimize command"),
        }
    }
}
