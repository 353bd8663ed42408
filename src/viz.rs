//! Visualization utilities for backtest results.
//!
//! Terminal-friendly rendering: ASCII sparklines, a tabled metrics
//! table, a colored summary report, and a self-contained SVG chart
//! comparing strategy and benchmark cumulative value. Nothing here
//! needs a plotting backend; SVG output is plain markup the dashboard
//! (or a browser) renders directly.
//!
//! # Example
//!
//! ```ignore
//! use folio::viz::{sparkline, ResultFormatter};
//!
//! println!("Equity: {}", sparkline(&result.strategy_cumulative, 40));
//! ResultFormatter::print_report(&result);
//! ```

use colored::Colorize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

use crate::backtest::BacktestResult;
use crate::error::Result;
use crate::metrics::RiskReport;

/// Characters used for sparkline rendering, ordered from low to high.
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Configuration for sparkline generation.
#[derive(Debug, Clone)]
pub struct SparklineConfig {
    /// Maximum width in characters.
    pub width: usize,
    /// Custom minimum value (defaults to the data minimum).
    pub min_value: Option<f64>,
    /// Custom maximum value (defaults to the data maximum).
    pub max_value: Option<f64>,
}

impl Default for SparklineConfig {
    fn default() -> Self {
        Self {
            width: 40,
            min_value: None,
            max_value: None,
        }
    }
}

/// Generate an ASCII sparkline from a slice of values.
pub fn sparkline(values: &[f64], width: usize) -> String {
    sparkline_with_config(
        values,
        &SparklineConfig {
            width,
            ..Default::default()
        },
    )
}

/// Generate an ASCII sparkline with custom configuration.
pub fn sparkline_with_config(values: &[f64], config: &SparklineConfig) -> String {
    if values.is_empty() {
        return String::new();
    }

    let sampled = if values.len() > config.width {
        downsample(values, config.width)
    } else {
        values.to_vec()
    };

    let min_val = config
        .min_value
        .unwrap_or_else(|| sampled.iter().cloned().fold(f64::INFINITY, f64::min));
    let max_val = config
        .max_value
        .unwrap_or_else(|| sampled.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
    let range = max_val - min_val;

    let mut result = String::with_capacity(sampled.len() * 4);
    for &val in &sampled {
        let normalized = if range > 0.0 {
            ((val - min_val) / range).clamp(0.0, 1.0)
        } else {
            0.5 // flat series
        };
        let idx = ((normalized * 7.0).round() as usize).min(7);
        result.push(SPARKLINE_CHARS[idx]);
    }

    result
}

/// Downsample a slice of values to a target length using averaging.
fn downsample(values: &[f64], target_len: usize) -> Vec<f64> {
    if values.len() <= target_len {
        return values.to_vec();
    }

    let chunk_size = values.len() as f64 / target_len as f64;
    let mut result = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let start = (i as f64 * chunk_size).floor() as usize;
        let end = (((i + 1) as f64 * chunk_size).ceil() as usize).min(values.len());
        if start < end {
            let sum: f64 = values[start..end].iter().sum();
            result.push(sum / (end - start) as f64);
        }
    }

    result
}

/// Format a fraction as a signed percentage.
fn format_pct(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}%", value * 100.0)
    } else {
        format!("{:.2}%", value * 100.0)
    }
}

/// Render the summary metrics as a bordered table.
pub fn metrics_table(result: &BacktestResult) -> String {
    let mut builder = Builder::new();
    builder.push_record([
        "",
        "Total Return",
        "Annual Return",
        "Volatility",
        "Sharpe",
        "Max DD",
    ]);

    for (name, m) in &result.metrics {
        builder.push_record([
            name.clone(),
            format_pct(m.total_return),
            format_pct(m.annual_return),
            format!("{:.2}%", m.annual_volatility * 100.0),
            format!("{:.2}", m.sharpe_ratio),
            format_pct(m.max_drawdown),
        ]);
    }

    builder.build().with(Style::rounded()).to_string()
}

/// Render a per-asset risk report as a bordered table.
pub fn risk_table(report: &RiskReport) -> String {
    let mut builder = Builder::new();
    builder.push_record([
        "Asset",
        "Annual Return",
        "Volatility",
        "Sharpe",
        "Sortino",
        "VaR 95%",
        "Max DD",
    ]);

    for (symbol, m) in &report.assets {
        builder.push_record([
            symbol.clone(),
            format_pct(m.annual_return),
            format!("{:.2}%", m.annual_volatility * 100.0),
            format!("{:.2}", m.sharpe_ratio),
            format!("{:.2}", m.sortino_ratio),
            format_pct(m.value_at_risk),
            format_pct(m.max_drawdown),
        ]);
    }

    builder.build().with(Style::rounded()).to_string()
}

/// One-line summary with sparkline and key metrics.
pub fn result_summary(result: &BacktestResult, width: usize) -> String {
    let spark = sparkline(&result.strategy_cumulative, width);
    let m = result.strategy_metrics();
    format!(
        "[{}] Return: {} | Sharpe: {:.2} | Max DD: {}",
        spark,
        format_pct(m.total_return),
        m.sharpe_ratio,
        format_pct(m.max_drawdown)
    )
}

/// Format results for terminal display.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Print a backtest report to stdout.
    pub fn print_report(result: &BacktestResult) {
        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " BACKTEST RESULTS ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();

        println!("{}", "Overview".bold().underline());
        println!(
            "  Period:          {} to {}",
            result.dates.first().map(|d| d.to_string()).unwrap_or_default(),
            result.dates.last().map(|d| d.to_string()).unwrap_or_default()
        );
        println!("  Trading Days:    {}", result.dates.len());
        println!(
            "  Equity:          [{}]",
            sparkline(&result.strategy_cumulative, 40)
        );
        println!();

        for (name, m) in &result.metrics {
            println!("{}", name.bold().underline());
            println!(
                "  Total Return:    {:>10}  {}",
                format!("{:.2}%", m.total_return * 100.0),
                Self::format_pct_change(m.total_return)
            );
            println!("  Annual Return:   {:>10.2}%", m.annual_return * 100.0);
            println!("  Volatility:      {:>10.2}%", m.annual_volatility * 100.0);
            println!("  Sharpe Ratio:    {:>10.2}", m.sharpe_ratio);
            println!("  Max Drawdown:    {:>10.2}%", m.max_drawdown * 100.0);
            println!();
        }

        println!("{}", "═".repeat(60).blue());
    }

    /// Format a fractional change with color.
    fn format_pct_change(pct: f64) -> String {
        if pct >= 0.0 {
            format!("(+{:.2}%)", pct * 100.0).green().to_string()
        } else {
            format!("({:.2}%)", pct * 100.0).red().to_string()
        }
    }
}

/// Render strategy vs. benchmark cumulative value as an SVG line chart.
pub fn comparison_svg(result: &BacktestResult) -> String {
    let width = 800.0;
    let height = 300.0;
    let padding = 50.0;
    let chart_width = width - 2.0 * padding;
    let chart_height = height - 2.0 * padding;

    let strategy = &result.strategy_cumulative;
    let benchmark = result.benchmark_cumulative.as_deref();

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for series in [Some(strategy.as_slice()), benchmark].into_iter().flatten() {
        for &v in series {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }
    // Pad the value axis so the lines stay off the frame.
    let span = (y_max - y_min).max(1e-9);
    let y_min = y_min - span * 0.05;
    let y_max = y_max + span * 0.05;
    let y_range = y_max - y_min;

    let path_for = |series: &[f64]| {
        let points: Vec<f64> = if series.len() > 500 {
            downsample(series, 500)
        } else {
            series.to_vec()
        };
        let mut d = String::new();
        for (i, &v) in points.iter().enumerate() {
            let x = padding + (i as f64 / (points.len() - 1).max(1) as f64) * chart_width;
            let y = padding + chart_height - ((v - y_min) / y_range) * chart_height;
            if i == 0 {
                let _ = write!(d, "M {:.1} {:.1}", x, y);
            } else {
                let _ = write!(d, " L {:.1} {:.1}", x, y);
            }
        }
        d
    };

    let grid_color = "#e0e0e0";
    let text_color = "#666";
    let strategy_color = "#007bff";
    let benchmark_color = "#6c757d";

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r##"<svg viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        width, height
    );

    // Horizontal grid and value labels.
    let num_y_ticks = 5;
    for i in 0..=num_y_ticks {
        let y_val = y_min + (i as f64 / num_y_ticks as f64) * y_range;
        let y = padding + chart_height - (i as f64 / num_y_ticks as f64) * chart_height;
        let _ = writeln!(
            svg,
            r##"  <line x1="{}" y1="{:.1}" x2="{}" y2="{:.1}" stroke="{}" stroke-dasharray="4,4"/>"##,
            padding,
            y,
            width - padding,
            y,
            grid_color
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{:.1}" font-size="10" fill="{}" text-anchor="end">{:.2}</text>"##,
            padding - 5.0,
            y + 3.0,
            text_color,
            y_val
        );
    }

    // Start and end dates.
    if let (Some(first), Some(last)) = (result.dates.first(), result.dates.last()) {
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" font-size="10" fill="{}" text-anchor="start">{}</text>"##,
            padding,
            height - 10.0,
            text_color,
            first
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" font-size="10" fill="{}" text-anchor="end">{}</text>"##,
            width - padding,
            height - 10.0,
            text_color,
            last
        );
    }

    let _ = writeln!(
        svg,
        r##"  <path d="{}" fill="none" stroke="{}" stroke-width="2"/>"##,
        path_for(strategy),
        strategy_color
    );
    let _ = writeln!(
        svg,
        r##"  <text x="{}" y="{}" font-size="11" fill="{}">Strategy</text>"##,
        padding + 5.0,
        padding - 8.0,
        strategy_color
    );

    if let Some(bench) = benchmark {
        let _ = writeln!(
            svg,
            r##"  <path d="{}" fill="none" stroke="{}" stroke-width="2" stroke-dasharray="6,3"/>"##,
            path_for(bench),
            benchmark_color
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" font-size="11" fill="{}">Benchmark</text>"##,
            padding + 70.0,
            padding - 8.0,
            benchmark_color
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write the comparison chart to an SVG file.
pub fn export_comparison_svg(result: &BacktestResult, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(comparison_svg(result).as_bytes())?;
    Ok(())
}
