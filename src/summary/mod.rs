//! Chain-wide liquidity summary
//!
//! Independent of any grid configuration: totals, per-side breakdown,
//! coverage ranges and bid-ask spread statistics for one snapshot.
//! Quote-invalid contracts are left out of every spread figure but always
//! count toward open interest and volume totals.

mod spread;

pub use spread::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{min_max, ChainSnapshot, ContractRecord, OptionType};

/// Default number of contracts kept in each spread ranking
pub const DEFAULT_RANKING_SIZE: usize = 5;

/// Contract count and liquidity for one side of the chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTotals {
    pub count: usize,
    pub open_interest: u64,
    pub volume: u64,
}

impl SideTotals {
    fn add(&mut self, record: &ContractRecord) {
        self.count += 1;
        self.open_interest += record.open_interest();
        self.volume += record.volume();
    }
}

/// Summary of one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub underlying_symbol: String,
    pub underlying_price: f64,
    pub observed_at: DateTime<Utc>,
    pub total_contracts: usize,
    pub total_open_interest: u64,
    pub total_volume: u64,
    pub calls: SideTotals,
    pub puts: SideTotals,
    /// Distinct expirations
    pub expirations: usize,
    /// Distinct strikes
    pub strikes: usize,
    /// (min, max) DTE, None for an empty snapshot
    pub dte_range: Option<(i64, i64)>,
    /// (min, max) moneyness, None for an empty snapshot
    pub moneyness_range: Option<(f64, f64)>,
    pub spread_stats: SpreadStats,
}

/// Summarize with the default ranking size
pub fn summarize(snapshot: &ChainSnapshot) -> SummaryStatistics {
    summarize_with(snapshot, DEFAULT_RANKING_SIZE)
}

/// Summarize, keeping `ranking_size` contracts in each spread ranking
pub fn summarize_with(snapshot: &ChainSnapshot, ranking_size: usize) -> SummaryStatistics {
    let records = snapshot.records();

    let mut calls = SideTotals::default();
    let mut puts = SideTotals::default();
    for record in records {
        match record.option_type() {
            OptionType::Call => calls.add(record),
            OptionType::Put => puts.add(record),
        }
    }

    let dte_range = records
        .iter()
        .map(|r| r.days_to_expiration())
        .fold(None, |range: Option<(i64, i64)>, dte| match range {
            Some((lo, hi)) => Some((lo.min(dte), hi.max(dte))),
            None => Some((dte, dte)),
        });

    let moneyness: Vec<f64> = records
        .iter()
        .map(|r| r.moneyness())
        .filter(|m| m.is_finite())
        .collect();

    let summary = SummaryStatistics {
        underlying_symbol: snapshot.underlying_symbol().to_string(),
        underlying_price: snapshot.underlying_price(),
        observed_at: snapshot.observed_at(),
        total_contracts: records.len(),
        total_open_interest: calls.open_interest + puts.open_interest,
        total_volume: calls.volume + puts.volume,
        calls,
        puts,
        expirations: snapshot.expirations().len(),
        strikes: snapshot.strikes().len(),
        dte_range,
        moneyness_range: min_max(&moneyness),
        spread_stats: spread_stats(records, ranking_size),
    };

    tracing::debug!(
        "{}: {} contracts, OI {}, volume {}, {} quoted",
        summary.underlying_symbol,
        summary.total_contracts,
        summary.total_open_interest,
        summary.total_volume,
        summary.spread_stats.contracts_with_quotes
    );

    summary
}
