//! Regression metrics.

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Held-out evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Mean squared error.
    pub mse: f64,
    /// Root mean squared error, `sqrt(mse)`.
    pub rmse: f64,
    /// Coefficient of determination, `1 - SS_res / SS_tot`.
    ///
    /// When the true values are constant, 1.0 for a perfect fit and 0.0
    /// otherwise.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute all metrics for aligned true and predicted values.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Configuration`] when the inputs are empty or
    /// differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if y_true.is_empty() {
            return Err(LearningError::Configuration(
                "Cannot evaluate on an empty set".to_string(),
            ));
        }
        if y_true.len() != y_pred.len() {
            return Err(LearningError::Configuration(format!(
                "Got {} true values but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }

        let n = y_true.len() as f64;
        let (abs_sum, sq_sum) = y_true
            .iter()
            .zip(y_pred)
            .fold((0.0, 0.0), |(a, s), (t, p)| {
                let e = t - p;
                (a + e.abs(), s + e * e)
            });

        let mae = abs_sum / n;
        let mse = sq_sum / n;
        let mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

        let r2 = if ss_tot == 0.0 {
            if sq_sum == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - sq_sum / ss_tot
        };

        Ok(Self {
            mae,
            mse,
            rmse: mse.sqrt(),
            r2,
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean Absolute Error (MAE): {}", self.mae)?;
        writeln!(f, "Mean Squared Error (MSE): {}", self.mse)?;
        writeln!(f, "Root Mean Squared Error (RMSE): {}", self.rmse)?;
        write!(f, "R² Score: {}", self.r2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = [1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_known_values() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();

        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.mse - 0.375).abs() < 1e-12);
        assert!((m.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((m.r2 - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn test_rmse_is_sqrt_mse_and_mae_bounded() {
        let y_true = [10.0, 20.0, 30.0, 40.0, 50.0];
        let y_pred = [12.0, 18.0, 35.0, 39.0, 41.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert_eq!(m.rmse, m.mse.sqrt());
        assert!(m.mae <= m.rmse);
        assert!(m.r2 <= 1.0);
    }

    #[test]
    fn test_mean_predictor_has_zero_r2() {
        let y_true = [1.0, 2.0, 3.0, 4.0];
        let y_pred = [2.5; 4];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_constant_target() {
        let y_true = [5.0, 5.0];
        assert_eq!(RegressionMetrics::compute(&y_true, &[5.0, 5.0]).unwrap().r2, 1.0);
        assert_eq!(RegressionMetrics::compute(&y_true, &[4.0, 6.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(RegressionMetrics::compute(&[], &[]).is_err());
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_err());
    }
}
