//! Exponential re-expression and peak normalization of aperture values.

use thiserror::Error;

/// Errors that can occur while transforming aperture values.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("aperture {index} is not finite: raw value {raw}")]
    NonFinite { index: usize, raw: f64 },
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Map every raw aperture to `exp(raw)`, then rescale so the largest value
/// equals `scale`.
///
/// Evaluated as `exp(raw - max(raw)) * scale`: the peak maps to exactly
/// `scale` and no finite input can overflow, or underflow into `0 / 0`.
/// NaN and infinite raw values are rejected.
pub fn exp_normalize(raw: &[f64], scale: f64) -> Result<Vec<f64>> {
    let mut peak = f64::NEG_INFINITY;
    for (index, &value) in raw.iter().enumerate() {
        if !value.is_finite() {
            return Err(TransformError::NonFinite { index, raw: value });
        }
        peak = peak.max(value);
    }

    Ok(raw.iter().map(|&value| (value - peak).exp() * scale).collect())
}
