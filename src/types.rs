//! Core data types shared by the backtest and risk metrics engines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FolioError, Result};

/// A date-aligned, columnar matrix of periodic fractional returns.
///
/// One equal-length column of per-period returns per asset, all columns
/// sharing a single ordered date index. Alignment is enforced at
/// construction, so every matrix-level operation can assume it. The
/// engines borrow a `ReturnMatrix` read-only and never mutate it.
///
/// Column order is significant: reports and metrics tables list assets
/// in the order their columns appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build a matrix from a shared date index and named return columns.
    ///
    /// Fails when any column's length differs from the date index or a
    /// symbol appears twice.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(impl Into<String>, Vec<f64>)>,
    ) -> Result<Self> {
        let n = dates.len();
        let mut symbols = Vec::with_capacity(columns.len());
        let mut series = Vec::with_capacity(columns.len());

        for (symbol, values) in columns {
            let symbol = symbol.into();
            if values.len() != n {
                return Err(FolioError::InvalidInput(format!(
                    "Column {} has {} observations, date index has {}",
                    symbol,
                    values.len(),
                    n
                )));
            }
            if symbols.contains(&symbol) {
                return Err(FolioError::InvalidInput(format!(
                    "Duplicate column: {}",
                    symbol
                )));
            }
            symbols.push(symbol);
            series.push(values);
        }

        Ok(Self {
            symbols,
            dates,
            columns: series,
        })
    }

    /// Number of periods (rows).
    pub fn num_periods(&self) -> usize {
        self.dates.len()
    }

    /// Number of assets (columns).
    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// True when the matrix has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.symbols.is_empty()
    }

    /// Asset symbols in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// The shared date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return series for one asset, if present.
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    /// Return series by column index.
    pub fn column_at(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Match a weight mapping against the matrix columns.
    ///
    /// Lookup is order-independent, but the result is aligned to column
    /// order so it can be used directly in the per-period dot product.
    /// Fails with [`FolioError::MissingWeight`] naming the first column
    /// the mapping does not cover. Extra entries in the mapping are
    /// ignored.
    pub fn resolve_weights(&self, weights: &HashMap<String, f64>) -> Result<Vec<f64>> {
        self.symbols
            .iter()
            .map(|s| {
                weights
                    .get(s)
                    .copied()
                    .ok_or_else(|| FolioError::MissingWeight(s.clone()))
            })
            .collect()
    }

    /// Weighted sum of asset returns for every period.
    ///
    /// `weights` must be aligned to column order (see
    /// [`resolve_weights`](Self::resolve_weights)).
    pub fn weighted_returns(&self, weights: &[f64]) -> Vec<f64> {
        (0..self.num_periods())
            .map(|t| {
                self.columns
                    .iter()
                    .zip(weights)
                    .map(|(col, w)| w * col[t])
                    .sum()
            })
            .collect()
    }
}
