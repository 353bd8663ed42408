//! Data loading and preprocessing.
//!
//! Reads wide CSV tables (a `Date` column plus one price or return column
//! per ticker) into the crate's columnar types, and provides the small
//! preprocessing steps the pipeline needs: cleaning, return computation,
//! and a train/test date split.
//!
//! Cleaning policy: rows are sorted ascending by date and any row with a
//! missing or non-numeric cell is dropped whole. Gaps are never filled.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{FolioError, Result};
use crate::types::ReturnMatrix;

/// Candidate formats tried when no explicit date format is configured.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// CSV parsing configuration.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Explicit date format (e.g. "%Y-%m-%d"). When None, common formats
    /// are tried in order.
    pub date_format: Option<String>,
    /// CSV delimiter character.
    pub delimiter: u8,
    /// Drop unparseable rows instead of failing the load.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            delimiter: b',',
            skip_invalid: true,
        }
    }
}

/// A cleaned, date-sorted table of close prices, one column per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Ticker symbols in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// The sorted date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows surviving the clean.
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    /// Price series for one ticker, if present.
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    /// Period-over-period fractional returns.
    ///
    /// The first row of the differencing is undefined and dropped, so the
    /// result has one fewer period than the price table. Requires at
    /// least 2 rows.
    pub fn returns(&self) -> Result<ReturnMatrix> {
        if self.num_rows() < 2 {
            return Err(FolioError::InvalidInput(format!(
                "Need at least 2 price rows to compute returns, have {}",
                self.num_rows()
            )));
        }

        let columns = self
            .symbols
            .iter()
            .zip(&self.columns)
            .map(|(symbol, prices)| {
                let series: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
                (symbol.clone(), series)
            })
            .collect();

        ReturnMatrix::from_columns(self.dates[1..].to_vec(), columns)
    }

    /// Split into rows on or before `boundary` and rows after it.
    pub fn split_at_date(&self, boundary: NaiveDate) -> (PriceTable, PriceTable) {
        let cut = self.dates.partition_point(|d| *d <= boundary);

        let take = |range: std::ops::Range<usize>| PriceTable {
            symbols: self.symbols.clone(),
            dates: self.dates[range.clone()].to_vec(),
            columns: self.columns.iter().map(|c| c[range.clone()].to_vec()).collect(),
        };

        (take(0..cut), take(cut..self.num_rows()))
    }
}

/// Load a wide close-price CSV into a [`PriceTable`].
///
/// The first column must be the date column (header `Date`, any case);
/// every remaining column is a ticker.
pub fn load_prices_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<PriceTable> {
    let (symbols, dates, columns) = load_wide_csv(path.as_ref(), config)?;
    Ok(PriceTable {
        symbols,
        dates,
        columns,
    })
}

/// Load a wide CSV of precomputed returns directly into a [`ReturnMatrix`].
pub fn load_returns_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<ReturnMatrix> {
    let (symbols, dates, columns) = load_wide_csv(path.as_ref(), config)?;
    ReturnMatrix::from_columns(dates, symbols.into_iter().zip(columns).collect())
}

/// Weights CSV row: `Asset,Weight`.
#[derive(Debug, Deserialize)]
struct WeightRow {
    #[serde(alias = "Asset", alias = "ASSET", alias = "symbol", alias = "Symbol")]
    asset: String,
    #[serde(alias = "Weight", alias = "WEIGHT")]
    weight: f64,
}

/// Load an `Asset,Weight` CSV into a weight mapping.
pub fn load_weights_csv(path: impl AsRef<Path>) -> Result<HashMap<String, f64>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut weights = HashMap::new();
    for record in reader.deserialize() {
        let row: WeightRow = record?;
        weights.insert(row.asset, row.weight);
    }

    if weights.is_empty() {
        return Err(FolioError::DataError(format!(
            "No weights found in {}",
            path.display()
        )));
    }

    info!("Loaded {} weights from {}", weights.len(), path.display());
    Ok(weights)
}

/// Shared wide-table parser: date column first, numeric columns after.
fn load_wide_csv(
    path: &Path,
    config: &DataConfig,
) -> Result<(Vec<String>, Vec<NaiveDate>, Vec<Vec<f64>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter)
        .flexible(false)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(FolioError::DataError(format!(
            "{}: expected a date column and at least one value column",
            path.display()
        )));
    }
    if !headers[0].eq_ignore_ascii_case("date") && !headers[0].eq_ignore_ascii_case("timestamp") {
        return Err(FolioError::DataError(format!(
            "{}: first column must be the date column, found {:?}",
            path.display(),
            &headers[0]
        )));
    }

    let symbols: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
    let n_cols = symbols.len();

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record?;
        match parse_row(&record, n_cols, config.date_format.as_deref()) {
            Ok(row) => rows.push(row),
            Err(e) => {
                if config.skip_invalid {
                    dropped += 1;
                    warn!("Dropping row {:?}: {}", record.get(0).unwrap_or(""), e);
                } else {
                    return Err(e);
                }
            }
        }
    }

    if rows.is_empty() {
        return Err(FolioError::DataError(format!(
            "{}: no usable rows",
            path.display()
        )));
    }

    rows.sort_by_key(|(date, _)| *date);

    let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
    let mut columns = vec![Vec::with_capacity(rows.len()); n_cols];
    for (_, values) in &rows {
        for (col, &v) in columns.iter_mut().zip(values) {
            col.push(v);
        }
    }

    info!(
        "Loaded {} rows x {} columns from {} ({} dropped)",
        dates.len(),
        n_cols,
        path.display(),
        dropped
    );

    Ok((symbols, dates, columns))
}

fn parse_row(
    record: &csv::StringRecord,
    n_cols: usize,
    date_format: Option<&str>,
) -> Result<(NaiveDate, Vec<f64>)> {
    let date_field = record
        .get(0)
        .ok_or_else(|| FolioError::DataError("Empty record".to_string()))?;
    let date = parse_date(date_field.trim(), date_format)?;

    let mut values = Vec::with_capacity(n_cols);
    for i in 0..n_cols {
        let field = record
            .get(i + 1)
            .ok_or_else(|| FolioError::DataError(format!("Row {} is short", date)))?
            .trim();
        let value: f64 = field
            .parse()
            .map_err(|_| FolioError::DataError(format!("Non-numeric cell {:?} on {}", field, date)))?;
        if !value.is_finite() {
            return Err(FolioError::DataError(format!(
                "Missing value on {}",
                date
            )));
        }
        values.push(value);
    }

    Ok((date, values))
}

/// Parse a date with the configured format, or by trying common formats.
fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    if let Some(fmt) = format {
        return Ok(NaiveDate::parse_from_str(s, fmt)?);
    }

    let mut last_err = None;
    for fmt in DATE_FORMATS {
        match NaiveDate::parse_from_str(s, fmt) {
            Ok(date) => return Ok(date),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("at least one format attempted").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_prices_sorts_by_date() {
        let file = write_csv(
            "Date,TSLA,SPY\n\
             2024-01-04,102.0,50.5\n\
             2024-01-02,100.0,50.0\n\
             2024-01-03,101.0,50.2\n",
        );

        let table = load_prices_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(table.symbols(), &["TSLA".to_string(), "SPY".to_string()]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column("TSLA").unwrap(), &[100.0, 101.0, 102.0]);
    }

    #[test]
    fn test_load_prices_drops_incomplete_rows() {
        let file = write_csv(
            "Date,TSLA,SPY\n\
             2024-01-02,100.0,50.0\n\
             2024-01-03,,50.2\n\
             2024-01-04,102.0,50.5\n\
             2024-01-05,103.0,not_a_number\n",
        );

        let table = load_prices_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("SPY").unwrap(), &[50.0, 50.5]);
    }

    #[test]
    fn test_strict_mode_fails_on_bad_row() {
        let file = write_csv(
            "Date,TSLA\n\
             2024-01-02,100.0\n\
             2024-01-03,\n",
        );

        let config = DataConfig {
            skip_invalid: false,
            ..Default::default()
        };
        assert!(load_prices_csv(file.path(), &config).is_err());
    }

    #[test]
    fn test_returns_drop_first_period() {
        let file = write_csv(
            "Date,A\n\
             2024-01-02,100.0\n\
             2024-01-03,110.0\n\
             2024-01-04,99.0\n",
        );

        let table = load_prices_csv(file.path(), &DataConfig::default()).unwrap();
        let returns = table.returns().unwrap();

        assert_eq!(returns.num_periods(), 2);
        let series = returns.column("A").unwrap();
        assert!((series[0] - 0.1).abs() < 1e-12);
        assert!((series[1] - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
        // Return dates start at the second price date.
        assert_eq!(returns.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_returns_require_two_rows() {
        let file = write_csv("Date,A\n2024-01-02,100.0\n");
        let table = load_prices_csv(file.path(), &DataConfig::default()).unwrap();
        assert!(matches!(table.returns(), Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_split_at_date() {
        let file = write_csv(
            "Date,A\n\
             2024-12-30,1.0\n\
             2024-12-31,2.0\n\
             2025-01-02,3.0\n\
             2025-01-03,4.0\n",
        );

        let table = load_prices_csv(file.path(), &DataConfig::default()).unwrap();
        let (train, test) = table.split_at_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        assert_eq!(train.num_rows(), 2);
        assert_eq!(test.num_rows(), 2);
        assert_eq!(train.column("A").unwrap(), &[1.0, 2.0]);
        assert_eq!(test.column("A").unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn test_load_returns_csv() {
        let file = write_csv(
            "Date,A,B\n\
             2024-01-03,0.01,0.02\n\
             2024-01-04,-0.005,0.0\n",
        );

        let returns = load_returns_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(returns.num_assets(), 2);
        assert_eq!(returns.num_periods(), 2);
        assert_eq!(returns.column("B").unwrap(), &[0.02, 0.0]);
    }

    #[test]
    fn test_load_weights_csv() {
        let file = write_csv("Asset,Weight\nTSLA,0.25\nSPY,0.45\nBND,0.30\n");

        let weights = load_weights_csv(file.path()).unwrap();
        assert_eq!(weights.len(), 3);
        assert!((weights["SPY"] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_table_without_date_column() {
        let file = write_csv("TSLA,SPY\n100.0,50.0\n");
        assert!(load_prices_csv(file.path(), &DataConfig::default()).is_err());
    }

    #[test]
    fn test_explicit_date_format() {
        let file = write_csv("Date,A\n02.01.2024,100.0\n03.01.2024,101.0\n");
        let config = DataConfig {
            date_format: Some("%d.%m.%Y".to_string()),
            ..Default::default()
        };

        let table = load_prices_csv(file.path(), &config).unwrap();
        assert_eq!(table.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
