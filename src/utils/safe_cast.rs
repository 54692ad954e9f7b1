//! Safe casting utilities for grid indices and color channels

use crate::{Error, Result};

/// Safely convert f64 to i64 with bounds checking, truncating toward zero
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i64 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
#[allow(clippy::cast_precision_loss)] // MIN/MAX bounds checking is approximate
pub fn f64_to_i64(value: f64) -> Result<i64> {
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i64"
        )))
    }
}

/// Grid cell containing `coord` for cells of `cell_size`, if inside `0..count`
#[must_use]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn cell_index(coord: f64, cell_size: f64, count: usize) -> Option<usize> {
    if !coord.is_finite() || coord < 0.0 || cell_size <= 0.0 {
        return None;
    }
    let index = (coord / cell_size).floor();
    if index.is_finite() && index < count as f64 {
        Some(index as usize)
    } else {
        None
    }
}

/// Round and clamp a value to a color channel
#[must_use]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn f64_to_u8_clamp(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
