//! Mean-variance portfolio optimization.
//!
//! Markowitz weight selection over a [`ReturnMatrix`]: maximum Sharpe
//! ratio with a minimum-volatility fallback, long-only and fully
//! invested. The quadratic programs are solved with clarabel.
//!
//! [`optimize_weights`] is the pipeline entry point; it never fails on a
//! degenerate estimation problem, degrading to minimum volatility and
//! finally to equal weights instead (each step logged).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::{FolioError, Result};
use crate::types::ReturnMatrix;

/// Configuration for weight optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Trading periods per year for annualizing the estimates.
    pub periods_per_year: f64,
    /// Annual risk-free rate used by the maximum-Sharpe objective.
    pub risk_free_rate: f64,
    /// Weights below this magnitude are zeroed during cleaning.
    pub weight_cutoff: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.02,
            weight_cutoff: 1e-4,
        }
    }
}

/// Mean-variance optimizer over annualized return/covariance estimates.
pub struct MeanVarianceOptimizer {
    /// Asset symbols in order.
    symbols: Vec<String>,
    /// Annualized expected returns.
    expected_returns: Vec<f64>,
    /// Annualized covariance matrix.
    covariance_matrix: Vec<Vec<f64>>,
    /// Annualized risk-free rate.
    risk_free_rate: f64,
}

impl MeanVarianceOptimizer {
    /// Create an optimizer from precomputed estimates.
    pub fn new(
        symbols: Vec<String>,
        expected_returns: Vec<f64>,
        covariance_matrix: Vec<Vec<f64>>,
        risk_free_rate: f64,
    ) -> Result<Self> {
        let n = symbols.len();
        if expected_returns.len() != n {
            return Err(FolioError::InvalidInput(
                "Expected returns length must match number of symbols".to_string(),
            ));
        }
        if covariance_matrix.len() != n || covariance_matrix.iter().any(|row| row.len() != n) {
            return Err(FolioError::InvalidInput(
                "Covariance matrix must be square and match number of symbols".to_string(),
            ));
        }

        Ok(Self {
            symbols,
            expected_returns,
            covariance_matrix,
            risk_free_rate,
        })
    }

    /// Estimate annualized expected returns and sample covariance from a
    /// return matrix.
    pub fn from_returns(returns: &ReturnMatrix, config: &OptimizerConfig) -> Result<Self> {
        if returns.is_empty() {
            return Err(FolioError::InvalidInput(
                "Return matrix is empty".to_string(),
            ));
        }
        let periods = returns.num_periods();
        if periods < 2 {
            return Err(FolioError::InvalidInput(format!(
                "Need at least 2 periods to estimate covariance, have {}",
                periods
            )));
        }

        let n = returns.num_assets();
        let means: Vec<f64> = (0..n)
            .map(|i| returns.column_at(i).iter().sum::<f64>() / periods as f64)
            .collect();

        let expected_returns: Vec<f64> =
            means.iter().map(|m| m * config.periods_per_year).collect();

        let mut covariance_matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let cov = returns
                    .column_at(i)
                    .iter()
                    .zip(returns.column_at(j))
                    .map(|(ri, rj)| (ri - means[i]) * (rj - means[j]))
                    .sum::<f64>()
                    / (periods - 1) as f64;
                let annualized = cov * config.periods_per_year;
                covariance_matrix[i][j] = annualized;
                covariance_matrix[j][i] = annualized;
            }
        }

        Self::new(
            returns.symbols().to_vec(),
            expected_returns,
            covariance_matrix,
            config.risk_free_rate,
        )
    }

    /// Minimum-volatility portfolio: minimize w'Σw subject to sum(w) = 1
    /// and w >= 0.
    pub fn min_volatility(&self) -> Result<HashMap<String, f64>> {
        use clarabel::algebra::*;
        use clarabel::solver::*;

        let n = self.symbols.len();
        let p = self.covariance_csc();
        let q = vec![0.0; n];

        // Constraints: sum(w) = 1 (zero cone), then -w <= 0 (nonnegative cone).
        let mut a_data = Vec::new();
        let mut a_indices = Vec::new();
        let mut a_indptr = vec![0];
        for j in 0..n {
            a_data.push(1.0);
            a_indices.push(0);
            a_data.push(-1.0);
            a_indices.push(1 + j);
            a_indptr.push(a_data.len());
        }
        let a = CscMatrix::new(1 + n, n, a_indptr, a_indices, a_data);

        let mut b = vec![1.0];
        b.extend(vec![0.0; n]);
        let cones = [ZeroConeT(1), NonnegativeConeT(n)];

        let x = solve_qp(&p, &q, &a, &b, &cones)?;

        Ok(self
            .symbols
            .iter()
            .zip(x.iter())
            .map(|(s, &w)| (s.clone(), w.max(0.0)))
            .collect())
    }

    /// Maximum Sharpe ratio portfolio.
    ///
    /// Solved as minimize w'Σw subject to (μ - rf)'w = 1 and w >= 0,
    /// then normalized to sum to 1. Falls back to minimum volatility
    /// when no asset's expected return exceeds the risk-free rate (the
    /// Sharpe objective is unbounded-from-below there).
    pub fn max_sharpe(&self) -> Result<HashMap<String, f64>> {
        use clarabel::algebra::*;
        use clarabel::solver::*;

        let excess_returns: Vec<f64> = self
            .expected_returns
            .iter()
            .map(|&r| r - self.risk_free_rate)
            .collect();

        if excess_returns.iter().all(|&r| r <= 0.0) {
            warn!("No asset exceeds the risk-free rate; using minimum volatility");
            return self.min_volatility();
        }

        let n = self.symbols.len();
        let p = self.covariance_csc();
        let q = vec![0.0; n];

        let mut a_data = Vec::new();
        let mut a_indices = Vec::new();
        let mut a_indptr = vec![0];
        for (j, &excess) in excess_returns.iter().enumerate() {
            a_data.push(excess);
            a_indices.push(0);
            a_data.push(-1.0);
            a_indices.push(1 + j);
            a_indptr.push(a_data.len());
        }
        let a = CscMatrix::new(1 + n, n, a_indptr, a_indices, a_data);

        let mut b = vec![1.0];
        b.extend(vec![0.0; n]);
        let cones = [ZeroConeT(1), NonnegativeConeT(n)];

        let x = solve_qp(&p, &q, &a, &b, &cones)?;

        let total: f64 = x.iter().sum();
        if total <= 0.0 {
            return Err(FolioError::OptimizationError(
                "Max Sharpe solution has non-positive weight sum".to_string(),
            ));
        }

        Ok(self
            .symbols
            .iter()
            .zip(x.iter())
            .map(|(s, &w)| (s.clone(), (w / total).max(0.0)))
            .collect())
    }

    /// Annualized expected portfolio return under `weights`.
    pub fn portfolio_return(&self, weights: &HashMap<String, f64>) -> f64 {
        self.symbols
            .iter()
            .zip(&self.expected_returns)
            .map(|(s, r)| weights.get(s).copied().unwrap_or(0.0) * r)
            .sum()
    }

    /// Annualized portfolio variance under `weights`.
    pub fn portfolio_variance(&self, weights: &HashMap<String, f64>) -> f64 {
        let n = self.symbols.len();
        let w: Vec<f64> = self
            .symbols
            .iter()
            .map(|s| weights.get(s).copied().unwrap_or(0.0))
            .collect();

        let mut variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                variance += w[i] * w[j] * self.covariance_matrix[i][j];
            }
        }
        variance
    }

    /// Annualized portfolio volatility under `weights`.
    pub fn portfolio_volatility(&self, weights: &HashMap<String, f64>) -> f64 {
        self.portfolio_variance(weights).sqrt()
    }

    /// Covariance matrix in CSC form for the solver.
    fn covariance_csc(&self) -> clarabel::algebra::CscMatrix {
        use clarabel::algebra::CscMatrix;

        let n = self.symbols.len();
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = vec![0];
        for j in 0..n {
            for i in 0..n {
                let val = self.covariance_matrix[i][j];
                if val.abs() > 1e-10 {
                    data.push(val);
                    indices.push(i);
                }
            }
            indptr.push(data.len());
        }
        CscMatrix::new(n, n, indptr, indices, data)
    }
}

/// Solve a QP with clarabel and extract the primal solution.
fn solve_qp(
    p: &clarabel::algebra::CscMatrix,
    q: &[f64],
    a: &clarabel::algebra::CscMatrix,
    b: &[f64],
    cones: &[clarabel::solver::SupportedConeT<f64>],
) -> Result<Vec<f64>> {
    use clarabel::solver::*;

    let settings = DefaultSettingsBuilder::default()
        .max_iter(100)
        .verbose(false)
        .build()
        .map_err(|e| FolioError::OptimizationError(format!("Failed to build settings: {}", e)))?;

    let mut solver = DefaultSolver::new(p, q, a, b, cones, settings);

    solver.solve();

    if !matches!(solver.solution.status, SolverStatus::Solved) {
        return Err(FolioError::OptimizationError(format!(
            "Optimization failed with status: {:?}",
            solver.solution.status
        )));
    }

    Ok(solver.solution.x.clone())
}

/// Optimize portfolio weights with the full fallback chain.
///
/// Tries maximum Sharpe; on solver failure falls back to minimum
/// volatility; if that fails too, returns equal weights. With fewer than
/// 2 assets there is nothing to optimize and equal weights are returned
/// directly. The result is cleaned: dust weights zeroed and the rest
/// renormalized, so entries are non-negative and sum to 1 within 1e-6.
pub fn optimize_weights(
    returns: &ReturnMatrix,
    config: &OptimizerConfig,
) -> Result<HashMap<String, f64>> {
    if returns.is_empty() {
        return Err(FolioError::InvalidInput(
            "Return matrix is empty".to_string(),
        ));
    }
    if returns.num_assets() < 2 {
        warn!("Fewer than 2 assets; returning equal weights");
        return Ok(equal_weights(returns.symbols()));
    }

    let optimizer = MeanVarianceOptimizer::from_returns(returns, config)?;

    let weights = match optimizer.max_sharpe() {
        Ok(w) => w,
        Err(e) => {
            warn!("Max Sharpe failed ({}); trying minimum volatility", e);
            match optimizer.min_volatility() {
                Ok(w) => w,
                Err(e) => {
                    warn!("Optimization failed ({}); using equal weights", e);
                    equal_weights(returns.symbols())
                }
            }
        }
    };

    Ok(clean_weights(weights, returns.symbols(), config.weight_cutoff))
}

/// Equal weights over the given symbols.
pub fn equal_weights(symbols: &[String]) -> HashMap<String, f64> {
    let w = 1.0 / symbols.len() as f64;
    symbols.iter().map(|s| (s.clone(), w)).collect()
}

/// Zero out dust weights and renormalize the remainder to sum to 1.
///
/// Falls back to equal weights when cleaning removes everything.
pub fn clean_weights(
    weights: HashMap<String, f64>,
    symbols: &[String],
    cutoff: f64,
) -> HashMap<String, f64> {
    let cleaned: HashMap<String, f64> = weights
        .into_iter()
        .map(|(s, w)| (s, if w.abs() < cutoff { 0.0 } else { w }))
        .collect();

    let total: f64 = cleaned.values().sum();
    if total <= 0.0 {
        warn!("All weights cleaned to zero; using equal weights");
        return equal_weights(symbols);
    }

    cleaned.into_iter().map(|(s, w)| (s, w / total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn matrix(columns: Vec<(&str, Vec<f64>)>) -> ReturnMatrix {
        let n = columns[0].1.len();
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        ReturnMatrix::from_columns(dates, columns).unwrap()
    }

    fn optimizer(
        returns: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        rf: f64,
    ) -> MeanVarianceOptimizer {
        let symbols: Vec<String> = (0..returns.len()).map(|i| format!("A{}", i)).collect();
        MeanVarianceOptimizer::new(symbols, returns, covariance, rf).unwrap()
    }

    #[test]
    fn test_min_volatility_equal_variances() {
        let opt = optimizer(
            vec![0.05, 0.05],
            vec![vec![0.04, 0.0], vec![0.0, 0.04]],
            0.0,
        );
        let weights = opt.min_volatility().unwrap();

        assert!((weights["A0"] - 0.5).abs() < 1e-3);
        assert!((weights["A1"] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_min_volatility_prefers_quieter_asset() {
        // Uncorrelated, variances 0.01 and 0.04: w0 = 0.04 / 0.05 = 0.8.
        let opt = optimizer(
            vec![0.05, 0.05],
            vec![vec![0.01, 0.0], vec![0.0, 0.04]],
            0.0,
        );
        let weights = opt.min_volatility().unwrap();

        assert!((weights["A0"] - 0.8).abs() < 1e-2);
        assert!((weights["A1"] - 0.2).abs() < 1e-2);
    }

    #[test]
    fn test_max_sharpe_tilts_to_higher_return() {
        // Identical variances, uncorrelated: w proportional to excess return.
        let opt = optimizer(
            vec![0.10, 0.05],
            vec![vec![0.04, 0.0], vec![0.0, 0.04]],
            0.0,
        );
        let weights = opt.max_sharpe().unwrap();

        assert!((weights["A0"] - 2.0 / 3.0).abs() < 1e-2);
        assert!((weights["A1"] - 1.0 / 3.0).abs() < 1e-2);

        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(weights.values().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_max_sharpe_falls_back_below_risk_free() {
        // Every expected return is below the risk-free rate.
        let opt = optimizer(
            vec![0.01, 0.015],
            vec![vec![0.04, 0.0], vec![0.0, 0.01]],
            0.05,
        );
        let weights = opt.max_sharpe().unwrap();

        // Minimum volatility answer: heavier on the quieter asset.
        assert!(weights["A1"] > weights["A0"]);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_optimize_weights_end_to_end() {
        let m = matrix(vec![
            ("TSLA", vec![0.02, -0.01, 0.03, 0.01, -0.02, 0.02, 0.01, -0.01]),
            ("SPY", vec![0.01, 0.0, 0.01, 0.005, -0.005, 0.01, 0.0, 0.005]),
            ("BND", vec![0.001, 0.001, 0.0, 0.001, 0.001, 0.0, 0.001, 0.0]),
        ]);

        let weights = optimize_weights(&m, &OptimizerConfig::default()).unwrap();

        assert_eq!(weights.len(), 3);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(weights.values().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_optimize_weights_single_asset() {
        let m = matrix(vec![("ONLY", vec![0.01, 0.02, -0.01])]);
        let weights = optimize_weights(&m, &OptimizerConfig::default()).unwrap();

        assert_eq!(weights.len(), 1);
        assert!((weights["ONLY"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clean_weights_zeros_dust_and_renormalizes() {
        let symbols = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let raw: HashMap<String, f64> = [
            ("A".to_string(), 0.6),
            ("B".to_string(), 0.39995),
            ("C".to_string(), 5e-5),
        ]
        .into_iter()
        .collect();

        let cleaned = clean_weights(raw, &symbols, 1e-4);

        assert_eq!(cleaned["C"], 0.0);
        let total: f64 = cleaned.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(cleaned["A"] > cleaned["B"]);
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let result = MeanVarianceOptimizer::new(
            vec!["A".to_string(), "B".to_string()],
            vec![0.05],
            vec![vec![0.04, 0.0], vec![0.0, 0.04]],
            0.0,
        );
        assert!(matches!(result, Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_portfolio_statistics() {
        let opt = optimizer(
            vec![0.10, 0.05],
            vec![vec![0.04, 0.0], vec![0.0, 0.01]],
            0.0,
        );
        let weights: HashMap<String, f64> =
            [("A0".to_string(), 0.5), ("A1".to_string(), 0.5)].into_iter().collect();

        assert!((opt.portfolio_return(&weights) - 0.075).abs() < 1e-12);
        assert!((opt.portfolio_variance(&weights) - 0.0125).abs() < 1e-12);
        assert!((opt.portfolio_volatility(&weights) - 0.0125_f64.sqrt()).abs() < 1e-12);
    }
}
