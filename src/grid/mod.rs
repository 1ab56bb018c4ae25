//! Liquidity grid aggregation
//!
//! Buckets a chain snapshot into an expiration x secondary-axis grid of one
//! liquidity metric.
//!
//! - Columns: one per distinct days-to-expiration, ascending
//! - Rows: exact strike, fixed-width moneyness bin, or fixed-width delta bin
//! - Cells: open interest / volume (absolute or % of the column) or the mean
//!   bid-ask spread of the contracts in the cell
//!
//! Grids are sparse: only cells that received at least one contract exist,
//! and a cell whose metric is undefined reads as "no data" rather than zero.

mod config;
mod engine;

pub use config::*;
pub use engine::*;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::{LiquidityError, LiquidityResult};

/// Sentinel used in dense exports for cells without data
pub const NO_DATA: f64 = f64::NAN;

/// Secondary (row) axis of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxisMode {
    /// Absolute strike, one row per distinct strike
    Strike,
    /// Strike / underlying, fixed-width bins
    Moneyness,
    /// Signed delta, fixed-width bins
    Delta,
}

impl YAxisMode {
    /// Axis title for renderers
    pub fn label(&self) -> &'static str {
        match self {
            YAxisMode::Strike => "Strike Price ($)",
            YAxisMode::Moneyness => "Moneyness (Strike/Spot)",
            YAxisMode::Delta => "Delta",
        }
    }
}

impl FromStr for YAxisMode {
    type Err = LiquidityError;

    fn from_str(s: &str) -> LiquidityResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strike" => Ok(YAxisMode::Strike),
            "moneyness" => Ok(YAxisMode::Moneyness),
            "delta" => Ok(YAxisMode::Delta),
            other => Err(LiquidityError::configuration(format!(
                "unknown y-axis mode '{}' (expected strike, moneyness or delta)",
                other
            ))),
        }
    }
}

/// Metric aggregated into each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    OiAbsolute,
    OiPercent,
    VolumeAbsolute,
    VolumePercent,
    SpreadAbsolute,
    SpreadPercent,
    SpreadPerDelta,
}

impl ValueMode {
    pub const ALL: [ValueMode; 7] = [
        ValueMode::OiAbsolute,
        ValueMode::OiPercent,
        ValueMode::VolumeAbsolute,
        ValueMode::VolumePercent,
        ValueMode::SpreadAbsolute,
        ValueMode::SpreadPercent,
        ValueMode::SpreadPerDelta,
    ];

    /// Name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ValueMode::OiAbsolute => "oi_absolute",
            ValueMode::OiPercent => "oi_percent",
            ValueMode::VolumeAbsolute => "volume_absolute",
            ValueMode::VolumePercent => "volume_percent",
            ValueMode::SpreadAbsolute => "spread_absolute",
            ValueMode::SpreadPercent => "spread_percent",
            ValueMode::SpreadPerDelta => "spread_per_delta",
        }
    }

    /// Colorbar title for renderers
    pub fn label(&self) -> &'static str {
        match self {
            ValueMode::OiAbsolute => "Open Interest",
            ValueMode::OiPercent => "Open Interest (% of DTE)",
            ValueMode::VolumeAbsolute => "Volume",
            ValueMode::VolumePercent => "Volume (% of DTE)",
            ValueMode::SpreadAbsolute => "Bid-Ask Spread ($)",
            ValueMode::SpreadPercent => "Bid-Ask Spread (fraction of mid)",
            ValueMode::SpreadPerDelta => "Spread per Delta",
        }
    }

    /// Spread modes average a price-quality figure instead of summing a count
    pub fn is_spread(&self) -> bool {
        matches!(
            self,
            ValueMode::SpreadAbsolute | ValueMode::SpreadPercent | ValueMode::SpreadPerDelta
        )
    }

    /// Percent modes normalize each cell by its column total
    pub fn is_percent(&self) -> bool {
        matches!(self, ValueMode::OiPercent | ValueMode::VolumePercent)
    }
}

impl FromStr for ValueMode {
    type Err = LiquidityError;

    fn from_str(s: &str) -> LiquidityResult<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ValueMode::ALL
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ValueMode::ALL.iter().map(|m| m.name()).collect();
                LiquidityError::configuration(format!(
                    "unknown value mode '{}' (expected one of {})",
                    wanted,
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid column: one expiration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpiryColumn {
    pub days_to_expiration: i64,
    pub expiration: NaiveDate,
}

impl ExpiryColumn {
    /// Column header, e.g. "7"
    pub fn label(&self) -> String {
        self.days_to_expiration.to_string()
    }
}

/// Sparse liquidity grid
///
/// Rows and columns are ordered ascending. Cells are addressed by
/// (row index, column index); a missing entry is "no data".
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    y_axis_mode: YAxisMode,
    value_mode: ValueMode,
    columns: Vec<ExpiryColumn>,
    rows: Vec<f64>,
    cells: BTreeMap<(usize, usize), f64>,
}

impl Grid {
    pub(crate) fn new(
        y_axis_mode: YAxisMode,
        value_mode: ValueMode,
        columns: Vec<ExpiryColumn>,
        rows: Vec<f64>,
        cells: BTreeMap<(usize, usize), f64>,
    ) -> Self {
        Self {
            y_axis_mode,
            value_mode,
            columns,
            rows,
            cells,
        }
    }

    /// Grid with no rows or columns
    pub fn empty(y_axis_mode: YAxisMode, value_mode: ValueMode) -> Self {
        Self::new(y_axis_mode, value_mode, Vec::new(), Vec::new(), BTreeMap::new())
    }

    pub fn y_axis_mode(&self) -> YAxisMode {
        self.y_axis_mode
    }

    pub fn value_mode(&self) -> ValueMode {
        self.value_mode
    }

    /// Expiration columns, ascending DTE
    pub fn columns(&self) -> &[ExpiryColumn] {
        &self.columns
    }

    /// Row labels (strike, moneyness bin or delta bin), ascending
    pub fn rows(&self) -> &[f64] {
        &self.rows
    }

    /// No rows and no columns
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    /// Cell value, None for "no data"
    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.cells.get(&(row, column)).copied()
    }

    /// All defined cells as (row, column, value), row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells.iter().map(|(&(r, c), &v)| (r, c, v))
    }

    /// Number of cells holding a value
    pub fn populated_cells(&self) -> usize {
        self.cells.len()
    }

    /// One column top to bottom
    pub fn column_values(&self, column: usize) -> Vec<Option<f64>> {
        (0..self.rows.len()).map(|r| self.value(r, column)).collect()
    }

    /// Column index for a DTE
    pub fn column_index(&self, days_to_expiration: i64) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.days_to_expiration == days_to_expiration)
    }

    /// Row index for a row label
    pub fn row_index(&self, label: f64) -> Option<usize> {
        self.rows.iter().position(|&r| r == label)
    }

    /// Smallest and largest defined cell value
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values: Vec<f64> = self.cells.values().copied().collect();
        crate::core::min_max(&values)
    }

    /// Dense rows x columns matrix with [`NO_DATA`] in empty cells
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::from_elem((self.rows.len(), self.columns.len()), NO_DATA);
        for (&(r, c), &v) in &self.cells {
            dense[[r, c]] = v;
        }
        dense
    }
}

/// Calls and puts aggregated separately with the same settings
#[derive(Debug, Clone, PartialEq)]
pub struct SplitGrid {
    pub calls: Grid,
    pub puts: Grid,
}
