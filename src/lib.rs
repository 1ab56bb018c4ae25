//! # Options Liquidity - Liquidity Grids for Option Chains
//!
//! Turns a snapshot of an options chain (every listed contract of one
//! underlying, across expirations and strikes) into liquidity grids and
//! chain-wide liquidity statistics.
//!
//! ## Overview
//!
//! - **Grids**: expiration (DTE) columns x strike / moneyness / delta rows,
//!   filled with open interest, volume (absolute or % of the expiration) or
//!   the mean bid-ask spread
//! - **Summary**: totals, call/put breakdown, coverage ranges, spread
//!   averages, medians and tightest/widest rankings
//! - **Data**: snapshot sources and an on-disk snapshot cache
//!
//! ## Usage
//!
//! ```rust,no_run
//! use options_liquidity::prelude::*;
//!
//! let source = JsonFileSource::new("spy_chain.json");
//! let snapshot = source.fetch_snapshot("SPY").unwrap();
//!
//! let config = HeatmapConfig::builder()
//!     .y_axis_mode(YAxisMode::Moneyness)
//!     .value_mode(ValueMode::OiPercent)
//!     .dte_range(0, 45)
//!     .build()
//!     .unwrap();
//!
//! let grid = build_grid(&snapshot, &config);
//! let summary = summarize(&snapshot);
//! println!("{} rows x {} expirations, OI {}", grid.rows().len(), grid.columns().len(), summary.total_open_interest);
//! ```
//!
//! ## What This Crate Does NOT Do
//!
//! - Fetch from a market-data provider (plug one in via `SnapshotSource`)
//! - Compute greeks (deltas are taken as delivered)
//! - Render charts
//! - Stream updates or persist computed grids

pub mod core;
pub mod data;
pub mod grid;
pub mod summary;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ChainData, ChainSnapshot, ContractQuote, ContractRecord, LiquidityError, LiquidityResult,
        OptionSide, OptionType, SnapshotFilter,
    };

    // Data sources
    pub use crate::data::{
        CacheConfig, CacheMetadata, CachedSource, JsonFileSource, SnapshotCache, SnapshotSource,
    };

    // Grids
    pub use crate::grid::{
        build_grid, ExpiryColumn, Grid, GridEngine, HeatmapConfig, HeatmapConfigBuilder,
        SplitGrid, ValueMode, YAxisMode, NO_DATA,
    };

    // Summary statistics
    pub use crate::summary::{
        spread_stats, summarize, summarize_with, SideTotals, SpreadRanking, SpreadStats,
        SummaryStatistics, DEFAULT_RANKING_SIZE,
    };
}

// Re-export main entry points at crate root
pub use crate::core::{LiquidityError, LiquidityResult};
pub use crate::grid::{build_grid, Grid, HeatmapConfig};
pub use crate::summary::{summarize, SummaryStatistics};
