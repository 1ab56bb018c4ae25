//! Shared numeric helpers for bucketing and averaging

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Nudge applied before flooring so that values sitting exactly on a bin
/// edge (0.30 / 0.05) are not pushed into the lower bin by rounding error.
const BIN_EPSILON: f64 = 1e-9;

/// Decimal places kept on bin labels
const LABEL_SCALE: f64 = 1e10;

/// A totally ordered axis coordinate (strike, moneyness bin or delta bin)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisValue(pub f64);

impl AxisValue {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for AxisValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AxisValue {}

impl PartialOrd for AxisValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AxisValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Index of the fixed-width bin containing `value`: floor(value / width)
pub fn bin_index(value: f64, width: f64) -> i64 {
    (value / width + BIN_EPSILON).floor() as i64
}

/// Lower edge of the fixed-width bin containing `value`
///
/// Labels are rebuilt from the integer bin index so every member of a bin
/// yields a bit-identical label.
pub fn bin_floor(value: f64, width: f64) -> f64 {
    let edge = bin_index(value, width) as f64 * width;
    let rounded = (edge * LABEL_SCALE).round() / LABEL_SCALE;
    // avoid a "-0" label for the bin starting at zero
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Arithmetic mean, None for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest and largest value, None for an empty slice
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}
