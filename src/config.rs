//! Configuration file support for the analytics pipeline.
//!
//! Allows loading pipeline runs from TOML files for reproducibility.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::backtest::BacktestConfig;
use crate::error::{FolioError, Result};
use crate::metrics::MetricsConfig;

/// Complete pipeline configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Data input settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Backtest settings.
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Risk metrics settings.
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// Output settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Data input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Path to the wide close-price CSV.
    pub prices_path: Option<String>,
    /// Path to the `Asset,Weight` CSV.
    pub weights_path: Option<String>,
    /// Date format in CSV (common formats are tried when unset).
    pub date_format: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            prices_path: None,
            weights_path: None,
            date_format: None,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Per-unit-turnover cost rate.
    #[serde(default = "default_transaction_cost")]
    pub transaction_cost: f64,
    /// Trading periods per year.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    /// Annual risk-free rate.
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Benchmark weights as an inline table, e.g. `{ SPY = 0.6, BND = 0.4 }`.
    /// No benchmark is simulated when unset.
    #[serde(default)]
    pub benchmark: Option<HashMap<String, f64>>,
}

fn default_transaction_cost() -> f64 {
    0.001
}
fn default_periods_per_year() -> f64 {
    252.0
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            transaction_cost: 0.001,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
            benchmark: None,
        }
    }
}

/// Risk metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Quantile for Value-at-Risk (0.05 = 95% VaR).
    #[serde(default = "default_var_confidence")]
    pub var_confidence: f64,
    /// Annual risk-free rate for Sharpe/Sortino.
    #[serde(default)]
    pub risk_free_rate: f64,
}

fn default_var_confidence() -> f64 {
    0.05
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            var_confidence: 0.05,
            risk_free_rate: 0.0,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory the exporters write into.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// Decimal precision for CSV values.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_output_dir() -> String {
    "output".to_string()
}
fn default_precision() -> usize {
    6
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            precision: 6,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| FolioError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Backtest engine configuration.
    pub fn to_backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            transaction_cost: self.backtest.transaction_cost,
            periods_per_year: self.backtest.periods_per_year,
            risk_free_rate: self.backtest.risk_free_rate,
        }
    }

    /// Risk metrics engine configuration.
    ///
    /// The annualization factor is shared with the backtest section so
    /// both engines report on the same basis.
    pub fn to_metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            periods_per_year: self.backtest.periods_per_year,
            var_confidence: self.metrics.var_confidence,
            risk_free_rate: self.metrics.risk_free_rate,
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Folio pipeline configuration

[data]
prices_path = "data/processed/close_prices.csv"
weights_path = "data/processed/portfolio_weights.csv"
# date_format = "%Y-%m-%d"

[backtest]
transaction_cost = 0.001
periods_per_year = 252.0
risk_free_rate = 0.0
benchmark = { SPY = 0.6, BND = 0.4 }

[metrics]
var_confidence = 0.05
risk_free_rate = 0.0

[output]
dir = "data/processed"
precision = 6
"#
        .to_string()
    }
}
