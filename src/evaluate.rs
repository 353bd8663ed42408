//! Forecast accuracy evaluation.
//!
//! Compares a model's predictions against realized values. The model
//! itself (ARIMA, LSTM, anything that produces an aligned prediction
//! series) lives outside this crate; only the scoring happens here.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Accuracy scores for one forecast against its realized series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute percentage error, in percent. Undefined (inf/NaN)
    /// when any actual value is zero.
    pub mape: f64,
}

impl ForecastAccuracy {
    /// Score `predicted` against `actual`.
    ///
    /// Both slices must be non-empty and the same length, aligned
    /// element-for-element.
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.is_empty() {
            return Err(FolioError::InvalidInput(
                "Cannot evaluate an empty forecast".to_string(),
            ));
        }
        if actual.len() != predicted.len() {
            return Err(FolioError::InvalidInput(format!(
                "Actual has {} observations, predicted has {}",
                actual.len(),
                predicted.len()
            )));
        }

        let n = actual.len() as f64;

        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;

        let mse = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum::<f64>()
            / n;
        let rmse = mse.sqrt();

        let mape = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| ((a - p) / a).abs())
            .sum::<f64>()
            / n
            * 100.0;

        Ok(Self { mae, rmse, mape })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_forecast_scores_zero() {
        let actual = [100.0, 101.0, 102.5];
        let scores = ForecastAccuracy::evaluate(&actual, &actual).unwrap();

        assert_eq!(scores.mae, 0.0);
        assert_eq!(scores.rmse, 0.0);
        assert_eq!(scores.mape, 0.0);
    }

    #[test]
    fn test_known_errors() {
        let actual = [100.0, 200.0];
        let predicted = [110.0, 180.0];
        let scores = ForecastAccuracy::evaluate(&actual, &predicted).unwrap();

        assert!((scores.mae - 15.0).abs() < 1e-12);
        // MSE = (100 + 400) / 2 = 250
        assert!((scores.rmse - 250.0_f64.sqrt()).abs() < 1e-12);
        // (10/100 + 20/200) / 2 * 100 = 10%
        assert!((scores.mape - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_rmse_at_least_mae() {
        let actual = [50.0, 51.0, 49.5, 52.0, 50.5];
        let predicted = [50.4, 50.2, 50.1, 51.0, 50.9];
        let scores = ForecastAccuracy::evaluate(&actual, &predicted).unwrap();

        assert!(scores.rmse >= scores.mae);
    }

    #[test]
    fn test_rejects_empty_and_mismatched() {
        assert!(matches!(
            ForecastAccuracy::evaluate(&[], &[]),
            Err(FolioError::InvalidInput(_))
        ));
        assert!(matches!(
            ForecastAccuracy::evaluate(&[1.0, 2.0], &[1.0]),
            Err(FolioError::InvalidInput(_))
        ));
    }
}
