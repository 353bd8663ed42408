//! Backtest engine for fixed-weight portfolios.
//!
//! Simulates a buy-and-hold allocation through a return matrix, applies a
//! transaction-cost drag, and summarizes strategy (and optionally
//! benchmark) performance with the risk metrics engine's formulas.
//!
//! The engine performs no I/O. Persisting the cumulative series and the
//! metrics table is the [`export`](crate::export) module's job, and
//! rendering is the [`viz`](crate::viz) module's; results are fully
//! usable without either.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{FolioError, Result};
use crate::metrics::{self, guarded_ratio};
use crate::types::ReturnMatrix;

/// Configuration for a backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Per-unit-turnover cost rate. Charged as a flat per-period drag of
    /// `turnover * transaction_cost / periods_per_year`, where turnover
    /// is the sum of absolute weights. The drag models a continuous cost
    /// of carry, not discrete rebalancing events: it applies every
    /// period whether or not any trading would have occurred.
    pub transaction_cost: f64,
    /// Trading periods per year, used for the cost drag and for
    /// annualizing summary metrics.
    pub periods_per_year: f64,
    /// Annual risk-free rate for the Sharpe ratio.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            transaction_cost: 0.001,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

/// Summary statistics for one portfolio trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    /// NaN when the trajectory's volatility is zero or undefined.
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl SummaryMetrics {
    /// Derive summary statistics from a cumulative value series.
    ///
    /// Statistics are computed on the series' percentage change, so they
    /// reflect exactly what the curve did, cost drag included. A
    /// single-period curve has undefined volatility; the Sharpe ratio
    /// degrades to the NaN sentinel in that case.
    pub fn from_cumulative(cumulative: &[f64], config: &BacktestConfig) -> Self {
        let returns: Vec<f64> = cumulative.windows(2).map(|w| w[1] / w[0] - 1.0).collect();

        let total_return = cumulative.last().unwrap_or(&1.0) / cumulative.first().unwrap_or(&1.0) - 1.0;
        let annual_return = metrics::mean(&returns) * config.periods_per_year;
        let annual_volatility = metrics::sample_std(&returns) * config.periods_per_year.sqrt();
        let sharpe_ratio = guarded_ratio(annual_return - config.risk_free_rate, annual_volatility);
        let max_drawdown = metrics::max_drawdown(cumulative);

        Self {
            total_return,
            annual_return,
            annual_volatility,
            sharpe_ratio,
            max_drawdown,
        }
    }
}

/// Output of a backtest run.
///
/// Cumulative series have one more element than the return matrix has
/// periods: index 0 is the unit initial capital (exactly 1.0), index t
/// is the compounded value after period t.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Date index of the underlying return matrix.
    pub dates: Vec<NaiveDate>,
    /// Cost-adjusted strategy return per period.
    pub strategy_returns: Vec<f64>,
    /// Compounded strategy value, starting at 1.0.
    pub strategy_cumulative: Vec<f64>,
    /// Benchmark return per period, when benchmark weights were given.
    pub benchmark_returns: Option<Vec<f64>>,
    /// Compounded benchmark value, starting at 1.0 (frictionless).
    pub benchmark_cumulative: Option<Vec<f64>>,
    /// Summary rows in report order: "Strategy", then "Benchmark" when
    /// present.
    pub metrics: Vec<(String, SummaryMetrics)>,
    /// The configuration the backtest ran with.
    pub config: BacktestConfig,
}

impl BacktestResult {
    /// Strategy summary row.
    pub fn strategy_metrics(&self) -> &SummaryMetrics {
        &self.metrics[0].1
    }

    /// Benchmark summary row, when a benchmark was simulated.
    pub fn benchmark_metrics(&self) -> Option<&SummaryMetrics> {
        self.metrics
            .iter()
            .find(|(name, _)| name == "Benchmark")
            .map(|(_, m)| m)
    }
}

/// Simulate a fixed-weight portfolio through a return matrix.
///
/// Every matrix column must have a weight in `weights` (and in
/// `benchmark_weights` when supplied); a missing asset fails with
/// [`FolioError::MissingWeight`]. Weight sign and sum are deliberately
/// not validated here — zero weights encode exclusion, and short or
/// levered books are the caller's responsibility.
///
/// The benchmark is simulated without the transaction-cost drag.
pub fn run_backtest(
    returns: &ReturnMatrix,
    weights: &HashMap<String, f64>,
    benchmark_weights: Option<&HashMap<String, f64>>,
    config: &BacktestConfig,
) -> Result<BacktestResult> {
    if returns.is_empty() {
        return Err(FolioError::InvalidInput(
            "Return matrix needs at least 1 period and 1 asset".to_string(),
        ));
    }

    let resolved = returns.resolve_weights(weights)?;

    // Static turnover proxy: total absolute exposure, charged every
    // period regardless of trading activity.
    let turnover: f64 = resolved.iter().map(|w| w.abs()).sum();
    let drag = turnover * config.transaction_cost / config.periods_per_year;
    debug!(turnover, drag, "Applying flat transaction-cost drag");

    let strategy_returns: Vec<f64> = returns
        .weighted_returns(&resolved)
        .into_iter()
        .map(|r| r - drag)
        .collect();
    let strategy_cumulative = compound(&strategy_returns);

    let mut metrics_rows = vec![(
        "Strategy".to_string(),
        SummaryMetrics::from_cumulative(&strategy_cumulative, config),
    )];

    let mut benchmark_returns = None;
    let mut benchmark_cumulative = None;
    if let Some(bench_weights) = benchmark_weights {
        let resolved_bench = returns.resolve_weights(bench_weights)?;
        let bench_returns = returns.weighted_returns(&resolved_bench);
        let bench_cumulative = compound(&bench_returns);

        metrics_rows.push((
            "Benchmark".to_string(),
            SummaryMetrics::from_cumulative(&bench_cumulative, config),
        ));

        benchmark_returns = Some(bench_returns);
        benchmark_cumulative = Some(bench_cumulative);
    }

    Ok(BacktestResult {
        dates: returns.dates().to_vec(),
        strategy_returns,
        strategy_cumulative,
        benchmark_returns,
        benchmark_cumulative,
        metrics: metrics_rows,
        config: *config,
    })
}

/// Compound unit capital through a return series: V_0 = 1,
/// V_t = V_{t-1} * (1 + r_t).
fn compound(returns: &[f64]) -> Vec<f64> {
    let mut values = Vec::with_capacity(returns.len() + 1);
    values.push(1.0);
    let mut acc = 1.0;
    for r in returns {
        acc *= 1.0 + r;
        values.push(acc);
    }
    values
}
