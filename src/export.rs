//! Export utilities for backtest and risk-metrics results.
//!
//! The engines themselves never touch the filesystem; everything that
//! ends up on disk goes through this module. Supported artifacts:
//!
//! - Cumulative-value CSV (`Date,Strategy[,Benchmark]`)
//! - Backtest metrics CSV (one row per trajectory)
//! - Risk-metrics CSV (one row per asset)
//! - Weights CSV (`Asset,Weight`)
//! - JSON summaries of either report
//!
//! # Example
//!
//! ```ignore
//! use folio::export::Exporter;
//!
//! let result = folio::backtest::run_backtest(&returns, &weights, None, &config)?;
//! let exporter = Exporter::new(result);
//! exporter.export_cumulative_csv("backtest_cumulative.csv")?;
//! exporter.export_metrics_csv("backtest_metrics.csv")?;
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::backtest::BacktestResult;
use crate::error::Result;
use crate::metrics::RiskReport;

/// Configuration for exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Date format for CSV exports.
    pub date_format: String,
    /// Decimal precision for numeric values.
    pub precision: usize,
    /// Whether to include headers in CSV.
    pub include_headers: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            precision: 6,
            include_headers: true,
        }
    }
}

/// Exporter for backtest results.
pub struct Exporter {
    result: BacktestResult,
    config: ExportConfig,
}

impl Exporter {
    /// Create a new exporter with default settings.
    pub fn new(result: BacktestResult) -> Self {
        Self {
            result,
            config: ExportConfig::default(),
        }
    }

    /// Create an exporter with custom config.
    pub fn with_config(result: BacktestResult, config: ExportConfig) -> Self {
        Self { result, config }
    }

    /// Export the cumulative value series to CSV.
    ///
    /// Columns are `Date,Strategy` plus `Benchmark` when a benchmark was
    /// simulated. The cumulative series carry one more point than there
    /// are return dates (the unit inception value); that row is dated
    /// one day before the first return date.
    pub fn export_cumulative_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let benchmark = self.result.benchmark_cumulative.as_deref();

        if self.config.include_headers {
            if benchmark.is_some() {
                writeln!(writer, "Date,Strategy,Benchmark")?;
            } else {
                writeln!(writer, "Date,Strategy")?;
            }
        }

        let prec = self.config.precision;
        let inception = self.result.dates[0] - Duration::days(1);

        for (t, &value) in self.result.strategy_cumulative.iter().enumerate() {
            let date = if t == 0 {
                inception
            } else {
                self.result.dates[t - 1]
            };
            write!(
                writer,
                "{},{:.prec$}",
                date.format(&self.config.date_format),
                value
            )?;
            if let Some(bench) = benchmark {
                write!(writer, ",{:.prec$}", bench[t])?;
            }
            writeln!(writer)?;
        }

        info!("Wrote cumulative series to {}", path.display());
        Ok(())
    }

    /// Export the summary metrics table to CSV.
    ///
    /// One row per trajectory (`Strategy`, then `Benchmark` when
    /// present), in the column layout the dashboard consumes.
    pub fn export_metrics_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        if self.config.include_headers {
            writeln!(
                writer,
                ",Total Return,Annualized Return,Annualized Volatility,Sharpe Ratio,Max Drawdown"
            )?;
        }

        let prec = self.config.precision;
        for (name, m) in &self.result.metrics {
            writeln!(
                writer,
                "{},{:.prec$},{:.prec$},{:.prec$},{:.prec$},{:.prec$}",
                name, m.total_return, m.annual_return, m.annual_volatility, m.sharpe_ratio,
                m.max_drawdown,
            )?;
        }

        info!("Wrote backtest metrics to {}", path.display());
        Ok(())
    }

    /// Export the full result as pretty-printed JSON.
    pub fn export_summary_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, &self.result)?;
        info!("Wrote JSON summary to {}", path.as_ref().display());
        Ok(())
    }

    /// The wrapped result, for callers that want it back.
    pub fn into_inner(self) -> BacktestResult {
        self.result
    }
}

/// Export a per-asset risk report to CSV.
///
/// One row per asset, in the report's column order.
pub fn export_risk_report_csv(
    report: &RiskReport,
    path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if config.include_headers {
        writeln!(
            writer,
            ",Annualized Return,Annualized Volatility,Sharpe Ratio,Sortino Ratio,VaR 95%,Max Drawdown"
        )?;
    }

    let prec = config.precision;
    for (symbol, m) in &report.assets {
        writeln!(
            writer,
            "{},{:.prec$},{:.prec$},{:.prec$},{:.prec$},{:.prec$},{:.prec$}",
            symbol,
            m.annual_return,
            m.annual_volatility,
            m.sharpe_ratio,
            m.sortino_ratio,
            m.value_at_risk,
            m.max_drawdown,
        )?;
    }

    info!("Wrote risk metrics to {}", path.display());
    Ok(())
}

/// Export a weight mapping to an `Asset,Weight` CSV.
///
/// Rows follow `symbols` so output is deterministic; symbols absent from
/// the mapping are written with weight 0.
pub fn export_weights_csv(
    weights: &HashMap<String, f64>,
    symbols: &[String],
    path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if config.include_headers {
        writeln!(writer, "Asset,Weight")?;
    }

    let prec = config.precision;
    for symbol in symbols {
        let w = weights.get(symbol).copied().unwrap_or(0.0);
        writeln!(writer, "{},{:.prec$}", symbol, w)?;
    }

    info!("Wrote {} weights to {}", symbols.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestConfig};
    use crate::metrics::{compute_risk_metrics, MetricsConfig};
    use crate::types::ReturnMatrix;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn sample_result(with_benchmark: bool) -> BacktestResult {
        let dates: Vec<NaiveDate> = (0..4)
            .map(|i| {
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        let matrix = ReturnMatrix::from_columns(
            dates,
            vec![("TSLA", vec![0.01, -0.02, 0.03, 0.0]), ("SPY", vec![0.005; 4])],
        )
        .unwrap();

        let weights: HashMap<String, f64> =
            [("TSLA".to_string(), 0.4), ("SPY".to_string(), 0.6)].into_iter().collect();
        let bench: HashMap<String, f64> =
            [("TSLA".to_string(), 0.0), ("SPY".to_string(), 1.0)].into_iter().collect();

        run_backtest(
            &matrix,
            &weights,
            with_benchmark.then_some(&bench),
            &BacktestConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_cumulative_csv_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cumulative.csv");

        Exporter::new(sample_result(true)).export_cumulative_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "Date,Strategy,Benchmark");
        // Header + inception row + 4 period rows.
        assert_eq!(lines.len(), 6);
        // Inception row is the day before the first return date, at 1.0.
        assert!(lines[1].starts_with("2024-01-01,1.000000,1.000000"));
        assert!(lines[2].starts_with("2024-01-02,"));
    }

    #[test]
    fn test_cumulative_csv_without_benchmark() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cumulative.csv");

        Exporter::new(sample_result(false)).export_cumulative_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Strategy\n"));
        assert!(!content.contains("Benchmark"));
    }

    #[test]
    fn test_metrics_csv_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        Exporter::new(sample_result(true)).export_metrics_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            ",Total Return,Annualized Return,Annualized Volatility,Sharpe Ratio,Max Drawdown"
        );
        assert!(lines[1].starts_with("Strategy,"));
        assert!(lines[2].starts_with("Benchmark,"));
    }

    #[test]
    fn test_risk_report_csv() {
        let dates: Vec<NaiveDate> = (0..5)
            .map(|i| {
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        let matrix = ReturnMatrix::from_columns(
            dates,
            vec![("A", vec![0.01, -0.01, 0.02, 0.0, 0.01]), ("B", vec![0.002; 5])],
        )
        .unwrap();
        let report = compute_risk_metrics(&matrix, &MetricsConfig::default()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("risk.csv");
        export_risk_report_csv(&report, &path, &ExportConfig::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("Sortino Ratio,VaR 95%,Max Drawdown"));
        assert!(lines[1].starts_with("A,"));
        assert!(lines[2].starts_with("B,"));
    }

    #[test]
    fn test_weights_csv_round_trip() {
        let symbols = vec!["TSLA".to_string(), "SPY".to_string(), "BND".to_string()];
        let weights: HashMap<String, f64> =
            [("TSLA".to_string(), 0.25), ("SPY".to_string(), 0.45)].into_iter().collect();

        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.csv");
        export_weights_csv(&weights, &symbols, &path, &ExportConfig::default()).unwrap();

        let loaded = crate::data::load_weights_csv(&path).unwrap();
        assert!((loaded["TSLA"] - 0.25).abs() < 1e-12);
        assert!((loaded["SPY"] - 0.45).abs() < 1e-12);
        // Missing symbol was written as zero.
        assert_eq!(loaded["BND"], 0.0);
    }

    #[test]
    fn test_summary_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");

        Exporter::new(sample_result(true)).export_summary_json(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed["strategy_cumulative"].is_array());
        assert_eq!(parsed["metrics"][0][0], "Strategy");
    }
}
