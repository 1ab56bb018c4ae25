//! Configuration for liquidity grid aggregation

use serde::Serialize;

use crate::core::{LiquidityError, LiquidityResult, OptionSide, SnapshotFilter};

use super::{ValueMode, YAxisMode};

/// Default moneyness bin width (1% of spot)
pub const DEFAULT_MONEYNESS_BIN_WIDTH: f64 = 0.01;

/// Default delta bin width
pub const DEFAULT_DELTA_BIN_WIDTH: f64 = 0.05;

/// Immutable heatmap configuration
///
/// Built through [`HeatmapConfig::builder`], which validates every field
/// once so the engine never meets a bad setting mid-aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapConfig {
    y_axis_mode: YAxisMode,
    value_mode: ValueMode,
    option_type: OptionSide,
    min_dte: i64,
    max_dte: i64,
    min_moneyness: f64,
    max_moneyness: f64,
    moneyness_bin_width: f64,
    delta_bin_width: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            y_axis_mode: YAxisMode::Strike,
            value_mode: ValueMode::OiAbsolute,
            option_type: OptionSide::Both,
            min_dte: 0,
            max_dte: 90,
            min_moneyness: 0.8,
            max_moneyness: 1.2,
            moneyness_bin_width: DEFAULT_MONEYNESS_BIN_WIDTH,
            delta_bin_width: DEFAULT_DELTA_BIN_WIDTH,
        }
    }
}

impl HeatmapConfig {
    pub fn builder() -> HeatmapConfigBuilder {
        HeatmapConfigBuilder::default()
    }

    pub fn y_axis_mode(&self) -> YAxisMode {
        self.y_axis_mode
    }

    pub fn value_mode(&self) -> ValueMode {
        self.value_mode
    }

    pub fn option_type(&self) -> OptionSide {
        self.option_type
    }

    pub fn dte_range(&self) -> (i64, i64) {
        (self.min_dte, self.max_dte)
    }

    pub fn moneyness_range(&self) -> (f64, f64) {
        (self.min_moneyness, self.max_moneyness)
    }

    pub fn moneyness_bin_width(&self) -> f64 {
        self.moneyness_bin_width
    }

    pub fn delta_bin_width(&self) -> f64 {
        self.delta_bin_width
    }

    /// Snapshot filter implied by the DTE, moneyness and option type settings
    pub fn filter(&self) -> SnapshotFilter {
        SnapshotFilter {
            min_dte: self.min_dte,
            max_dte: self.max_dte,
            min_moneyness: self.min_moneyness,
            max_moneyness: self.max_moneyness,
            option_type: self.option_type,
        }
    }

    /// Same settings restricted to one option side
    pub(crate) fn with_option_type(&self, option_type: OptionSide) -> Self {
        Self {
            option_type,
            ..self.clone()
        }
    }
}

/// Builder for [`HeatmapConfig`]
#[derive(Debug, Clone)]
pub struct HeatmapConfigBuilder {
    config: HeatmapConfig,
}

impl Default for HeatmapConfigBuilder {
    fn default() -> Self {
        Self {
            config: HeatmapConfig::default(),
        }
    }
}

impl HeatmapConfigBuilder {
    pub fn y_axis_mode(mut self, mode: YAxisMode) -> Self {
        self.config.y_axis_mode = mode;
        self
    }

    pub fn value_mode(mut self, mode: ValueMode) -> Self {
        self.config.value_mode = mode;
        self
    }

    pub fn option_type(mut self, option_type: OptionSide) -> Self {
        self.config.option_type = option_type;
        self
    }

    pub fn dte_range(mut self, min_dte: i64, max_dte: i64) -> Self {
        self.config.min_dte = min_dte;
        self.config.max_dte = max_dte;
        self
    }

    pub fn moneyness_range(mut self, min_moneyness: f64, max_moneyness: f64) -> Self {
        self.config.min_moneyness = min_moneyness;
        self.config.max_moneyness = max_moneyness;
        self
    }

    /// Drop the moneyness bounds entirely
    pub fn any_moneyness(self) -> Self {
        self.moneyness_range(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn moneyness_bin_width(mut self, width: f64) -> Self {
        self.config.moneyness_bin_width = width;
        self
    }

    pub fn delta_bin_width(mut self, width: f64) -> Self {
        self.config.delta_bin_width = width;
        self
    }

    /// Validate and freeze the configuration
    ///
    /// Inverted DTE or moneyness bounds are accepted: they select nothing
    /// and produce an empty grid.
    pub fn build(self) -> LiquidityResult<HeatmapConfig> {
        let config = self.config;

        for (name, width) in [
            ("moneyness", config.moneyness_bin_width),
            ("delta", config.delta_bin_width),
        ] {
            if !width.is_finite() || width <= 0.0 {
                return Err(LiquidityError::configuration(format!(
                    "{} bin width must be a positive number, got {}",
                    name, width
                )));
            }
        }

        if config.min_moneyness.is_nan() || config.max_moneyness.is_nan() {
            return Err(LiquidityError::configuration(
                "moneyness bounds must not be NaN",
            ));
        }

        Ok(config)
    }
}
