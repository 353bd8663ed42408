//! Risk metrics engine.
//!
//! Computes per-asset performance and risk statistics from a
//! [`ReturnMatrix`]: annualized return and volatility, Sharpe and Sortino
//! ratios, empirical Value-at-Risk, and maximum drawdown.
//!
//! All functions here are pure: same input, bit-identical output, no I/O.
//! Degenerate statistics (zero volatility) produce a NaN sentinel in the
//! affected ratio rather than an error, so the rest of the record stays
//! usable.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::types::ReturnMatrix;

/// Configuration for risk metric computation.
///
/// The annualization factor and VaR quantile are parameters rather than
/// constants so the engine works across periodicities; the defaults match
/// daily equity data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Trading periods per year used for annualization.
    pub periods_per_year: f64,
    /// Quantile for Value-at-Risk (0.05 = 95% VaR).
    pub var_confidence: f64,
    /// Annual risk-free rate subtracted in Sharpe/Sortino.
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            var_confidence: 0.05,
            risk_free_rate: 0.0,
        }
    }
}

/// Risk statistics for one asset or portfolio trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Mean period return scaled to a year.
    pub annual_return: f64,
    /// Sample standard deviation of period returns, annualized.
    pub annual_volatility: f64,
    /// Excess return per unit of volatility. NaN when volatility is zero.
    pub sharpe_ratio: f64,
    /// Excess return per unit of downside volatility. NaN when the
    /// downside deviation is zero.
    pub sortino_ratio: f64,
    /// Empirical return quantile at the configured confidence level.
    pub value_at_risk: f64,
    /// Worst peak-to-trough decline of the compounded wealth curve.
    /// Always <= 0; 0 only for a monotonically non-decreasing curve.
    pub max_drawdown: f64,
}

impl RiskMetrics {
    /// Compute the full record from one return series.
    ///
    /// Requires at least 2 observations; the sample statistics are
    /// undefined below that.
    pub fn from_returns(returns: &[f64], config: &MetricsConfig) -> Result<Self> {
        if returns.len() < 2 {
            return Err(FolioError::InvalidInput(format!(
                "Need at least 2 observations to compute risk metrics, have {}",
                returns.len()
            )));
        }

        let annual_return = mean(returns) * config.periods_per_year;
        let annual_volatility = sample_std(returns) * config.periods_per_year.sqrt();
        let sharpe_ratio = guarded_ratio(annual_return - config.risk_free_rate, annual_volatility);

        // Downside deviation: positive periods clamped to zero, then the
        // same sample deviation as above over the clamped series.
        let downside: Vec<f64> = returns.iter().map(|&r| r.min(0.0)).collect();
        let downside_volatility = sample_std(&downside) * config.periods_per_year.sqrt();
        let sortino_ratio =
            guarded_ratio(annual_return - config.risk_free_rate, downside_volatility);

        let value_at_risk = quantile(returns, config.var_confidence);

        let wealth = cumulative_wealth(returns);
        let max_drawdown = max_drawdown(&wealth);

        Ok(Self {
            annual_return,
            annual_volatility,
            sharpe_ratio,
            sortino_ratio,
            value_at_risk,
            max_drawdown,
        })
    }
}

/// Per-asset risk metrics, in the matrix's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// (symbol, metrics) pairs, one per asset column.
    pub assets: Vec<(String, RiskMetrics)>,
    /// The configuration the report was computed with.
    pub config: MetricsConfig,
}

impl RiskReport {
    /// Metrics for one asset, if present.
    pub fn get(&self, symbol: &str) -> Option<&RiskMetrics> {
        self.assets
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, m)| m)
    }
}

/// Compute risk metrics for every asset in the matrix.
///
/// Each column is evaluated independently; output order matches column
/// order. Fails when the matrix is empty or has fewer than 2 periods.
pub fn compute_risk_metrics(returns: &ReturnMatrix, config: &MetricsConfig) -> Result<RiskReport> {
    if returns.is_empty() {
        return Err(FolioError::InvalidInput(
            "Return matrix is empty".to_string(),
        ));
    }

    let assets = returns
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            RiskMetrics::from_returns(returns.column_at(i), config).map(|m| (symbol.clone(), m))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RiskReport {
        assets,
        config: *config,
    })
}

/// Arithmetic mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator).
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Empirical quantile with linear interpolation between order statistics
/// (the "type 7" convention shared by numpy and pandas defaults).
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let frac = h - lo as f64;

    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    } else {
        sorted[sorted.len() - 1]
    }
}

/// Compounded wealth curve: C_t = prod_{i<=t}(1 + r_i).
pub fn cumulative_wealth(returns: &[f64]) -> Vec<f64> {
    let mut wealth = Vec::with_capacity(returns.len());
    let mut acc = 1.0;
    for r in returns {
        acc *= 1.0 + r;
        wealth.push(acc);
    }
    wealth
}

/// Maximum drawdown of a cumulative value curve, as a negative fraction.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    if curve.is_empty() {
        return f64::NAN;
    }
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &v in curve {
        peak = peak.max(v);
        worst = worst.min(v / peak - 1.0);
    }
    worst
}

/// Ratio with a NaN sentinel on a zero denominator.
pub(crate) fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
