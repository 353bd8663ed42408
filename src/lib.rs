//! Folio - portfolio backtesting and risk analytics.
//!
//! # Overview
//!
//! Folio is the computation core of a quantitative research pipeline:
//! it turns a table of historical prices into portfolio weights, a
//! backtested equity curve, and the standard performance and risk
//! statistics.
//!
//! - **Risk metrics**: annualized return/volatility, Sharpe, Sortino,
//!   empirical VaR, max drawdown - per asset, from one return matrix
//! - **Backtesting**: fixed-weight buy-and-hold simulation with a
//!   turnover-based transaction-cost drag and an optional frictionless
//!   benchmark
//! - **Optimization**: long-only mean-variance weights (max Sharpe with
//!   a min-volatility fallback)
//! - **Data handling**: CSV price/return/weight loading, cleaning,
//!   return computation, train/test splitting
//! - **Reporting**: CSV/JSON/SVG artifacts and terminal tables
//!
//! The engines are pure functions over in-memory matrices: no I/O, no
//! globals, deterministic output. Persistence and rendering live in the
//! [`export`] and [`viz`] collaborator modules, so every computation is
//! fully usable with persistence disabled.
//!
//! # Quick Start
//!
//! ```no_run
//! use folio::backtest::{run_backtest, BacktestConfig};
//! use folio::data::{load_prices_csv, load_weights_csv, DataConfig};
//!
//! let prices = load_prices_csv("data/close_prices.csv", &DataConfig::default()).unwrap();
//! let returns = prices.returns().unwrap();
//! let weights = load_weights_csv("data/portfolio_weights.csv").unwrap();
//!
//! let result = run_backtest(&returns, &weights, None, &BacktestConfig::default()).unwrap();
//! println!("Total return: {:.2}%", result.strategy_metrics().total_return * 100.0);
//! println!("Sharpe: {:.2}", result.strategy_metrics().sharpe_ratio);
//! ```
//!
//! # Modules
//!
//! - [`types`]: the columnar, date-aligned [`types::ReturnMatrix`]
//! - [`data`]: CSV loading, cleaning, and return computation
//! - [`metrics`]: per-asset risk metrics engine
//! - [`backtest`]: fixed-weight backtest engine
//! - [`portfolio`]: mean-variance weight optimization
//! - [`evaluate`]: forecast accuracy scoring (MAE/RMSE/MAPE)
//! - [`export`]: CSV/JSON persistence collaborators
//! - [`viz`]: sparklines, tables, and the comparison SVG
//! - [`config`]: TOML pipeline configuration

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod metrics;
pub mod portfolio;
pub mod types;
pub mod viz;

// Re-exports for convenience
pub use backtest::{run_backtest, BacktestConfig, BacktestResult, SummaryMetrics};
pub use config::PipelineConfig;
pub use data::{load_prices_csv, load_returns_csv, load_weights_csv, DataConfig, PriceTable};
pub use error::{FolioError, Result};
pub use evaluate::ForecastAccuracy;
pub use export::{export_risk_report_csv, export_weights_csv, ExportConfig, Exporter};
pub use metrics::{compute_risk_metrics, MetricsConfig, RiskMetrics, RiskReport};
pub use portfolio::{optimize_weights, MeanVarianceOptimizer, OptimizerConfig};
pub use types::ReturnMatrix;
pub use viz::{comparison_svg, metrics_table, result_summary, sparkline, ResultFormatter};
