//! Bid-ask spread statistics and rankings

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};

use crate::core::{mean, min_max, ContractRecord, OptionType};

/// Chain-wide spread figures over quoted contracts
///
/// A contract counts as quoted when its spread percent is defined: a
/// consistent bid/ask with a positive mid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadStats {
    pub contracts_with_quotes: usize,
    pub avg_spread_absolute: Option<f64>,
    /// Mean of spread / mid (a fraction, not x100)
    pub avg_spread_percent: Option<f64>,
    pub median_spread_absolute: Option<f64>,
    pub median_spread_percent: Option<f64>,
    pub min_spread_absolute: Option<f64>,
    pub max_spread_absolute: Option<f64>,
    /// Smallest spread percent first
    pub tightest_spread_contracts: Vec<SpreadRanking>,
    /// Largest spread percent first
    pub widest_spread_contracts: Vec<SpreadRanking>,
}

/// One contract in a spread ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadRanking {
    pub symbol: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub days_to_expiration: i64,
    pub bid: f64,
    pub ask: f64,
    pub spread_absolute: f64,
    pub spread_percent: f64,
}

impl SpreadRanking {
    fn from_record(record: &ContractRecord, spread_absolute: f64, spread_percent: f64) -> Self {
        Self {
            symbol: record.symbol().to_string(),
            option_type: record.option_type(),
            strike: record.strike(),
            days_to_expiration: record.days_to_expiration(),
            bid: record.bid(),
            ask: record.ask(),
            spread_absolute,
            spread_percent,
        }
    }
}

/// Spread statistics over `records`, keeping `ranking_size` contracts in
/// each ranking
pub fn spread_stats(records: &[ContractRecord], ranking_size: usize) -> SpreadStats {
    let quoted: Vec<SpreadRanking> = records
        .iter()
        .filter(|r| r.is_quoted())
        .filter_map(|r| match (r.spread_absolute(), r.spread_percent()) {
            (Some(abs), Some(pct)) => Some(SpreadRanking::from_record(r, abs, pct)),
            _ => None,
        })
        .collect();

    if quoted.is_empty() {
        return SpreadStats::default();
    }

    let absolutes: Vec<f64> = quoted.iter().map(|q| q.spread_absolute).collect();
    let percents: Vec<f64> = quoted.iter().map(|q| q.spread_percent).collect();
    let (min_abs, max_abs) = match min_max(&absolutes) {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };

    let mut tightest = quoted.clone();
    tightest.sort_by(tightest_first);
    tightest.truncate(ranking_size);

    let mut widest = quoted.clone();
    widest.sort_by(widest_first);
    widest.truncate(ranking_size);

    SpreadStats {
        contracts_with_quotes: quoted.len(),
        avg_spread_absolute: mean(&absolutes),
        avg_spread_percent: mean(&percents),
        median_spread_absolute: Some(Data::new(absolutes).median()),
        median_spread_percent: Some(Data::new(percents).median()),
        min_spread_absolute: min_abs,
        max_spread_absolute: max_abs,
        tightest_spread_contracts: tightest,
        widest_spread_contracts: widest,
    }
}

/// Ascending spread percent, then spread absolute, then symbol
fn tightest_first(a: &SpreadRanking, b: &SpreadRanking) -> Ordering {
    a.spread_percent
        .total_cmp(&b.spread_percent)
        .then(a.spread_absolute.total_cmp(&b.spread_absolute))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Descending spread percent, then spread absolute; symbol stays ascending
fn widest_first(a: &SpreadRanking, b: &SpreadRanking) -> Ordering {
    b.spread_percent
        .total_cmp(&a.spread_percent)
        .then(b.spread_absolute.total_cmp(&a.spread_absolute))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContractQuote;
    use chrono::NaiveDate;

    fn record(symbol: &str, bid: f64, ask: f64) -> ContractRecord {
        let quote = ContractQuote {
            symbol: symbol.to_string(),
            underlying_symbol: "IWM".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 5, 16).unwrap(),
            strike: 200.0,
            option_type: OptionType::Put,
            open_interest: 10,
            volume: 1,
            bid,
            ask,
            last_price: 0.0,
            delta: Some(-0.4),
            gamma: None,
            theta: None,
            vega: None,
            implied_volatility: None,
        };
        ContractRecord::from_quote(&quote, 210.0, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())
    }

    #[test]
    fn test_rankings_order_and_tie_breaks() {
        let records = vec![
            record("D", 1.0, 1.5),  // 0.4
            record("B", 2.0, 2.5),  // 2/9
            record("A", 4.0, 5.0),  // 2/9, larger absolute
            record("C", 1.0, 1.25), // 2/9, smaller absolute
            record("Z", 0.0, 0.0),  // no mid
            record("X", 3.0, 2.0),  // crossed
        ];

        let stats = spread_stats(&records, 3);

        assert_eq!(stats.contracts_with_quotes, 4);
        let tight: Vec<&str> = stats.tightest_spread_contracts.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(tight, vec!["C", "B", "A"]);
        let wide: Vec<&str> = stats.widest_spread_contracts.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(wide, vec!["D", "A", "B"]);
    }

    #[test]
    fn test_identical_quotes_rank_by_symbol() {
        // same bid/ask: percent and absolute tie, only the symbol decides
        let records = vec![
            record("N", 2.0, 2.2),
            record("W", 1.0, 1.5),
            record("M", 2.0, 2.2),
            record("T", 3.0, 3.05),
        ];

        let stats = spread_stats(&records, 4);

        let tight: Vec<&str> = stats.tightest_spread_contracts.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(tight, vec!["T", "M", "N", "W"]);
        let wide: Vec<&str> = stats.widest_spread_contracts.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(wide, vec!["W", "M", "N", "T"]);

        // input order does not leak into the ranking
        let mut reversed = records.clone();
        reversed.reverse();
        let again = spread_stats(&reversed, 4);
        assert_eq!(again.tightest_spread_contracts, stats.tightest_spread_contracts);
        assert_eq!(again.widest_spread_contracts, stats.widest_spread_contracts);
    }

    #[test]
    fn test_rankings_are_reverse_orderings() {
        let records: Vec<ContractRecord> = (1..=6)
            .map(|i| record(&format!("S{}", i), 1.0, 1.0 + i as f64 * 0.05))
            .collect();

        let stats = spread_stats(&records, 10);
        let mut reversed = stats.widest_spread_contracts.clone();
        reversed.reverse();
        assert_eq!(stats.tightest_spread_contracts, reversed);
    }

    #[test]
    fn test_averages_exclude_unquoted() {
        let records = vec![record("A", 1.0, 1.2), record("B", 1.0, 1.4), record("Z", 0.0, 0.0)];

        let stats = spread_stats(&records, 5);

        assert!((stats.avg_spread_absolute.unwrap() - 0.3).abs() < 1e-12);
        let expected_pct = (0.2 / 1.1 + 0.4 / 1.2) / 2.0;
        assert!((stats.avg_spread_percent.unwrap() - expected_pct).abs() < 1e-12);
        assert!((stats.median_spread_absolute.unwrap() - 0.3).abs() < 1e-12);
        assert!((stats.min_spread_absolute.unwrap() - 0.2).abs() < 1e-12);
        assert!((stats.max_spread_absolute.unwrap() - 0.4).abs() < 1e-12);
        assert!(stats
            .tightest_spread_contracts
            .iter()
            .all(|r| r.symbol != "Z"));
    }

    #[test]
    fn test_no_quotes_gives_empty_stats() {
        let stats = spread_stats(&[record("Z", 0.0, 0.0)], 5);
        assert_eq!(stats, SpreadStats::default());
    }
}
