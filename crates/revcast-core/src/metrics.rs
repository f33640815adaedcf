//! Accuracy metrics used to rank calibration candidates.
//!
//! - **MAE**: error in revenue units
//! - **MAPE**: mean relative error as a fraction, with the denominator
//!   floored so zero-revenue days stay finite
//! - **RMSE**: reported alongside, penalizes large misses

use crate::error::{ForecastError, Result};
use statrs::statistics::{Data, Median};

/// Smallest denominator used by [`mape`].
pub const MAPE_FLOOR: f64 = 1e-9;

/// Calculates Mean Absolute Error between actual and predicted values.
///
/// # Formula
/// MAE = (1/n) * Σ|actual_i - forecast_i|
///
/// # Example
/// ```
/// use revcast_core::metrics::mae;
/// let actual = vec![1.0, 2.0, 3.0];
/// let forecast = vec![1.1, 2.2, 2.8];
/// let error = mae(&actual, &forecast).unwrap();
/// assert!((error - 0.166).abs() < 0.01);
/// ```
pub fn mae(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Calculates Mean Absolute Percentage Error as a fraction.
///
/// Every point contributes; the denominator is `max(|actual|, 1e-9)`, so a
/// zero actual with a non-zero forecast yields a very large but finite term.
///
/// # Formula
/// MAPE = (1/n) * Σ|actual_i - forecast_i| / max(|actual_i|, 1e-9)
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs() / a.abs().max(MAPE_FLOOR))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Calculates Root Mean Squared Error.
///
/// # Formula
/// RMSE = √((1/n) * Σ(actual_i - forecast_i)²)
pub fn rmse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    Ok((sum / actual.len() as f64).sqrt())
}

/// Median of a non-empty sample.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(ForecastError::InvalidInput(
            "median of an empty sample".to_string(),
        ));
    }
    Ok(Data::new(values.to_vec()).median())
}

fn validate_inputs(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.len() != forecast.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Actual and forecast arrays must have the same length: {} vs {}",
            actual.len(),
            forecast.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Actual and forecast arrays are empty".to_string(),
        ));
    }
    Ok(())
}
