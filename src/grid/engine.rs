//! Grid aggregation engine
//!
//! filter -> assign (column, row) keys -> group -> per-cell metric.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{bin_floor, mean, AxisValue, ChainSnapshot, ContractRecord, OptionSide};

use super::{ExpiryColumn, Grid, HeatmapConfig, SplitGrid, ValueMode, YAxisMode};

/// Facade that aggregates snapshots under one configuration
pub struct GridEngine {
    config: HeatmapConfig,
}

impl GridEngine {
    pub fn new(config: HeatmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Aggregate `snapshot` into a grid
    pub fn build(&self, snapshot: &ChainSnapshot) -> Grid {
        build_grid(snapshot, &self.config)
    }

    /// Aggregate calls and puts into separate grids
    ///
    /// The configured option type is ignored; every other setting applies
    /// to both sides.
    pub fn build_split(&self, snapshot: &ChainSnapshot) -> SplitGrid {
        SplitGrid {
            calls: build_grid(snapshot, &self.config.with_option_type(OptionSide::Call)),
            puts: build_grid(snapshot, &self.config.with_option_type(OptionSide::Put)),
        }
    }
}

/// Aggregate `snapshot` into a grid of `config.value_mode()`
///
/// Empty input gives an empty grid and an all-invalid spread request gives
/// a grid whose cells are all "no data"; neither is an error.
pub fn build_grid(snapshot: &ChainSnapshot, config: &HeatmapConfig) -> Grid {
    let mode = config.value_mode();
    let filtered = snapshot.filtered(&config.filter());

    if filtered.is_empty() {
        tracing::debug!(
            "No {} contracts left after filtering; empty grid",
            snapshot.underlying_symbol()
        );
        return Grid::empty(config.y_axis_mode(), mode);
    }

    // Step 1: group records by (expiration column, row key)
    let mut groups: BTreeMap<(ExpiryColumn, AxisValue), CellAccumulator> = BTreeMap::new();
    let mut unplaced = 0usize;

    for record in filtered.records() {
        let Some(row) = row_key(record, config) else {
            unplaced += 1;
            continue;
        };
        let column = ExpiryColumn {
            days_to_expiration: record.days_to_expiration(),
            expiration: record.expiration(),
        };
        groups.entry((column, row)).or_default().add(record, mode);
    }

    if unplaced > 0 {
        tracing::debug!("{} records had no finite {:?} coordinate", unplaced, config.y_axis_mode());
    }

    // Step 2: labels from the populated groups only
    let columns: Vec<ExpiryColumn> = groups
        .keys()
        .map(|(column, _)| *column)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows: Vec<AxisValue> = groups
        .keys()
        .map(|(_, row)| *row)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let column_index: BTreeMap<ExpiryColumn, usize> =
        columns.iter().enumerate().map(|(i, c)| (*c, i)).collect();
    let row_index: BTreeMap<AxisValue, usize> =
        rows.iter().enumerate().map(|(i, r)| (*r, i)).collect();

    // Step 3: column totals before any per-cell division
    let mut column_totals: BTreeMap<ExpiryColumn, u64> = BTreeMap::new();
    if mode.is_percent() {
        for ((column, _), acc) in &groups {
            *column_totals.entry(*column).or_default() += acc.liquidity(mode);
        }
    }

    // Step 4: cell values
    let mut cells = BTreeMap::new();
    for ((column, row), acc) in &groups {
        let total = column_totals.get(column).copied().unwrap_or(0);
        let Some(value) = cell_value(acc, mode, total) else {
            continue;
        };
        if let (Some(&r), Some(&c)) = (row_index.get(row), column_index.get(column)) {
            cells.insert((r, c), value);
        }
    }

    tracing::debug!(
        "{} {} grid: {} rows x {} columns, {} of {} cells with data",
        snapshot.underlying_symbol(),
        mode,
        rows.len(),
        columns.len(),
        cells.len(),
        groups.len()
    );

    Grid::new(
        config.y_axis_mode(),
        mode,
        columns,
        rows.into_iter().map(|r| r.value()).collect(),
        cells,
    )
}

/// Row coordinate of a record, None when it is not a finite number
fn row_key(record: &ContractRecord, config: &HeatmapConfig) -> Option<AxisValue> {
    let raw = match config.y_axis_mode() {
        YAxisMode::Strike => record.strike(),
        YAxisMode::Moneyness => record.moneyness(),
        YAxisMode::Delta => record.delta(),
    };
    if !raw.is_finite() {
        return None;
    }

    let key = match config.y_axis_mode() {
        YAxisMode::Strike => raw,
        YAxisMode::Moneyness => bin_floor(raw, config.moneyness_bin_width()),
        YAxisMode::Delta => bin_floor(raw, config.delta_bin_width()),
    };
    Some(AxisValue(key))
}

/// Running figures for one (column, row) group
#[derive(Debug, Default)]
struct CellAccumulator {
    open_interest: u64,
    volume: u64,
    spreads: Vec<f64>,
}

impl CellAccumulator {
    fn add(&mut self, record: &ContractRecord, mode: ValueMode) {
        self.open_interest += record.open_interest();
        self.volume += record.volume();

        if !mode.is_spread() || !record.is_quoted() {
            return;
        }

        let spread = match mode {
            ValueMode::SpreadAbsolute => record.spread_absolute(),
            ValueMode::SpreadPercent => record.spread_percent(),
            ValueMode::SpreadPerDelta => record.spread_per_delta(),
            _ => None,
        };
        if let Some(s) = spread.filter(|s| s.is_finite()) {
            self.spreads.push(s);
        }
    }

    /// Open interest or volume, whichever the mode counts
    fn liquidity(&self, mode: ValueMode) -> u64 {
        match mode {
            ValueMode::OiAbsolute | ValueMode::OiPercent => self.open_interest,
            _ => self.volume,
        }
    }
}

fn cell_value(acc: &CellAccumulator, mode: ValueMode, column_total: u64) -> Option<f64> {
    match mode {
        ValueMode::OiAbsolute | ValueMode::VolumeAbsolute => Some(acc.liquidity(mode) as f64),
        ValueMode::OiPercent | ValueMode::VolumePercent => {
            if column_total == 0 {
                None
            } else {
                Some(acc.liquidity(mode) as f64 / column_total as f64 * 100.0)
            }
        }
        // simple mean over the valid quotes in the cell
        ValueMode::SpreadAbsolute | ValueMode::SpreadPercent | ValueMode::SpreadPerDelta => {
            mean(&acc.spreads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChainData, ContractQuote, OptionType};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const SPOT: f64 = 100.0;

    fn observed_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    struct Q {
        strike: f64,
        dte: i64,
        option_type: OptionType,
        open_interest: u64,
        volume: u64,
        bid: f64,
        ask: f64,
        delta: Option<f64>,
    }

    impl Q {
        fn new(strike: f64, dte: i64, open_interest: u64) -> Self {
            Self {
                strike,
                dte,
                option_type: OptionType::Call,
                open_interest,
                volume: 0,
                bid: 1.0,
                ask: 1.2,
                delta: Some(0.5),
            }
        }

        fn into_quote(self) -> ContractQuote {
            ContractQuote {
                symbol: format!("T{}{:?}{}", self.dte, self.option_type, self.strike),
                underlying_symbol: "TEST".to_string(),
                expiration: observed_on() + chrono::Duration::days(self.dte),
                strike: self.strike,
                option_type: self.option_type,
                open_interest: self.open_interest,
                volume: self.volume,
                bid: self.bid,
                ask: self.ask,
                last_price: 0.0,
                delta: self.delta,
                gamma: None,
                theta: None,
                vega: None,
                implied_volatility: None,
            }
        }
    }

    fn snapshot(quotes: Vec<Q>) -> ChainSnapshot {
        ChainSnapshot::from_raw(ChainData {
            underlying_symbol: "TEST".to_string(),
            underlying_price: SPOT,
            fetch_timestamp: Utc.with_ymd_and_hms(2025, 2, 3, 14, 0, 0).unwrap(),
            contracts: quotes.into_iter().map(Q::into_quote).collect(),
        })
    }

    fn config(y_axis: YAxisMode, value: ValueMode) -> HeatmapConfig {
        HeatmapConfig::builder()
            .y_axis_mode(y_axis)
            .value_mode(value)
            .any_moneyness()
            .build()
            .unwrap()
    }

    fn two_expiry_chain() -> ChainSnapshot {
        snapshot(vec![
            Q::new(95.0, 7, 100),
            Q::new(105.0, 7, 50),
            Q::new(95.0, 30, 20),
            Q::new(105.0, 30, 80),
        ])
    }

    #[test]
    fn test_oi_percent_normalizes_per_column() {
        let grid = build_grid(&two_expiry_chain(), &config(YAxisMode::Strike, ValueMode::OiPercent));

        let labels: Vec<String> = grid.columns().iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["7", "30"]);
        assert_eq!(grid.rows(), &[95.0, 105.0]);

        let near: Vec<f64> = grid.column_values(0).into_iter().flatten().collect();
        let far: Vec<f64> = grid.column_values(1).into_iter().flatten().collect();
        assert!((near[0] - 66.666_666).abs() < 1e-3);
        assert!((near[1] - 33.333_333).abs() < 1e-3);
        assert!((far[0] - 20.0).abs() < 1e-9);
        assert!((far[1] - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_mode_sums_group() {
        // call and put on the same strike collapse into one row
        let mut put = Q::new(100.0, 14, 40);
        put.option_type = OptionType::Put;
        put.delta = Some(-0.5);
        let chain = snapshot(vec![Q::new(100.0, 14, 60), put, Q::new(110.0, 14, 5)]);

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::OiAbsolute));

        assert_eq!(grid.rows(), &[100.0, 110.0]);
        assert_eq!(grid.value(0, 0), Some(100.0));
        assert_eq!(grid.value(1, 0), Some(5.0));
    }

    #[test]
    fn test_zero_liquidity_is_a_value_not_missing() {
        let chain = snapshot(vec![Q::new(100.0, 14, 0), Q::new(110.0, 14, 7)]);
        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::OiAbsolute));

        assert_eq!(grid.value(0, 0), Some(0.0));
    }

    #[test]
    fn test_sparse_grid_has_no_data_holes() {
        // 95 only trades in the near expiry, 105 only in the far one
        let chain = snapshot(vec![Q::new(95.0, 7, 10), Q::new(105.0, 30, 20)]);
        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::OiAbsolute));

        assert_eq!(grid.rows().len(), 2);
        assert_eq!(grid.columns().len(), 2);
        assert_eq!(grid.value(0, 1), None);
        assert_eq!(grid.value(1, 0), None);
        assert_eq!(grid.populated_cells(), 2);
    }

    #[test]
    fn test_zero_total_column_is_no_data() {
        let mut a = Q::new(95.0, 7, 0);
        a.volume = 0;
        let mut b = Q::new(105.0, 7, 0);
        b.volume = 0;
        let mut c = Q::new(95.0, 30, 0);
        c.volume = 12;
        let chain = snapshot(vec![a, b, c]);

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::VolumePercent));

        assert_eq!(grid.columns().len(), 2);
        assert_eq!(grid.column_values(0), vec![None, None]);
        assert_eq!(grid.value(0, 1), Some(100.0));
    }

    #[test]
    fn test_spread_modes_average_valid_quotes() {
        let mut wide = Q::new(100.0, 10, 1);
        wide.bid = 1.0;
        wide.ask = 1.4;
        let mut tight = Q::new(100.0, 10, 1);
        tight.bid = 1.0;
        tight.ask = 1.2;
        let mut crossed = Q::new(100.0, 10, 1);
        crossed.bid = 2.0;
        crossed.ask = 1.0;
        let chain = snapshot(vec![wide, tight, crossed]);

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::SpreadAbsolute));
        let value = grid.value(0, 0).unwrap();
        assert!((value - 0.3).abs() < 1e-9);

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::SpreadPerDelta));
        let value = grid.value(0, 0).unwrap();
        assert!((value - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_all_invalid_spreads_give_no_data_grid() {
        let mut a = Q::new(100.0, 10, 5);
        a.bid = 0.0;
        a.ask = 0.0;
        let mut b = Q::new(105.0, 20, 5);
        b.bid = 0.0;
        b.ask = 0.0;
        let chain = snapshot(vec![a, b]);

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::SpreadPercent));

        assert_eq!(grid.rows().len(), 2);
        assert_eq!(grid.columns().len(), 2);
        assert_eq!(grid.populated_cells(), 0);
        assert!(grid.to_dense().iter().all(|v| v.is_nan()));

        // the same records still count for open interest
        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::OiAbsolute));
        assert_eq!(grid.populated_cells(), 2);
    }

    #[test]
    fn test_unquoted_contracts_stay_out_of_spread_cells() {
        // zero bid/ask: valid quote but no mid, so not quoted
        let mut quoted = Q::new(100.0, 10, 5);
        quoted.bid = 1.0;
        quoted.ask = 1.4;
        let mut unquoted = Q::new(100.0, 10, 5);
        unquoted.bid = 0.0;
        unquoted.ask = 0.0;
        let mut lonely = Q::new(110.0, 10, 5);
        lonely.bid = 0.0;
        lonely.ask = 0.0;
        let chain = snapshot(vec![quoted, unquoted, lonely]);

        for mode in [
            ValueMode::SpreadAbsolute,
            ValueMode::SpreadPercent,
            ValueMode::SpreadPerDelta,
        ] {
            let grid = build_grid(&chain, &config(YAxisMode::Strike, mode));
            assert_eq!(grid.rows(), &[100.0, 110.0]);
            assert_eq!(grid.value(1, 0), None, "{} cell of unquoted contract", mode);
        }

        let grid = build_grid(&chain, &config(YAxisMode::Strike, ValueMode::SpreadAbsolute));
        assert!((grid.value(0, 0).unwrap() - 0.4).abs() < 1e-9);

        // grid and summary agree on the quoted population
        let summary = crate::summary::summarize(&chain);
        assert_eq!(summary.spread_stats.contracts_with_quotes, 1);
        assert!((summary.spread_stats.avg_spread_absolute.unwrap() - grid.value(0, 0).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_dte_bounds_give_empty_grid() {
        let config = HeatmapConfig::builder()
            .dte_range(10, 5)
            .any_moneyness()
            .build()
            .unwrap();

        let grid = build_grid(&two_expiry_chain(), &config);
        assert!(grid.is_empty());
        assert!(grid.rows().is_empty());
        assert!(grid.columns().is_empty());
    }

    #[test]
    fn test_moneyness_rows_are_binned() {
        // 100.4 and 100.9 share the 1.00 bin, 101.5 lands in 1.01
        let chain = snapshot(vec![
            Q::new(100.4, 7, 1),
            Q::new(100.9, 7, 2),
            Q::new(101.5, 7, 4),
        ]);
        let grid = build_grid(&chain, &config(YAxisMode::Moneyness, ValueMode::OiAbsolute));

        assert_eq!(grid.rows(), &[1.0, 1.01]);
        assert_eq!(grid.value(0, 0), Some(3.0));
        assert_eq!(grid.value(1, 0), Some(4.0));
    }

    #[test]
    fn test_moneyness_bounds_filter_rows() {
        let chain = snapshot(vec![Q::new(70.0, 7, 1), Q::new(100.0, 7, 2), Q::new(150.0, 7, 4)]);
        let config = HeatmapConfig::builder()
            .y_axis_mode(YAxisMode::Moneyness)
            .build()
            .unwrap();

        let grid = build_grid(&chain, &config);
        assert_eq!(grid.rows(), &[1.0]);
    }

    #[test]
    fn test_delta_rows_span_puts_and_calls() {
        let mut quotes = Vec::new();
        for i in 1..=9 {
            let d = i as f64 / 10.0;
            let mut call = Q::new(100.0 + i as f64, 21, 10);
            call.delta = Some(d);
            let mut put = Q::new(100.0 - i as f64, 21, 10);
            put.option_type = OptionType::Put;
            put.delta = Some(-d);
            quotes.push(call);
            quotes.push(put);
        }
        let grid = build_grid(&snapshot(quotes), &config(YAxisMode::Delta, ValueMode::OiAbsolute));

        let rows = grid.rows();
        assert_eq!(rows.len(), 18);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
        assert!((rows[0] + 0.9).abs() < 1e-9);
        assert!((rows[rows.len() - 1] - 0.9).abs() < 1e-9);
        assert!(rows.iter().any(|&r| r < 0.0) && rows.iter().any(|&r| r > 0.0));
    }

    #[test]
    fn test_split_grids_separate_sides() {
        let mut put = Q::new(95.0, 7, 30);
        put.option_type = OptionType::Put;
        put.delta = Some(-0.3);
        let chain = snapshot(vec![Q::new(105.0, 7, 70), put]);

        let config = HeatmapConfig::builder()
            .option_type(OptionSide::Call)
            .value_mode(ValueMode::OiPercent)
            .any_moneyness()
            .build()
            .unwrap();
        let split = GridEngine::new(config).build_split(&chain);

        assert_eq!(split.calls.rows(), &[105.0]);
        assert_eq!(split.puts.rows(), &[95.0]);
        assert_eq!(split.calls.value(0, 0), Some(100.0));
        assert_eq!(split.puts.value(0, 0), Some(100.0));
    }

    fn random_chain(seed: u64) -> ChainSnapshot {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut quotes = Vec::new();
        for _ in 0..120 {
            let option_type = if rng.gen_bool(0.5) {
                OptionType::Call
            } else {
                OptionType::Put
            };
            let delta: f64 = rng.gen_range(0.01..0.99);
            let bid: f64 = rng.gen_range(0.0..5.0);
            quotes.push(Q {
                strike: 80.0 + rng.gen_range(0..40) as f64,
                dte: [0, 3, 7, 14, 30, 60][rng.gen_range(0..6)],
                option_type,
                open_interest: rng.gen_range(0..5000),
                volume: rng.gen_range(0..800),
                bid,
                ask: bid + rng.gen_range(0.0..0.5),
                delta: Some(match option_type {
                    OptionType::Call => delta,
                    OptionType::Put => -delta,
                }),
            });
        }
        snapshot(quotes)
    }

    #[test]
    fn test_build_is_deterministic() {
        for seed in 0..5 {
            let chain = random_chain(seed);
            for y_axis in [YAxisMode::Strike, YAxisMode::Moneyness, YAxisMode::Delta] {
                for value in ValueMode::ALL {
                    let config = config(y_axis, value);
                    assert_eq!(build_grid(&chain, &config), build_grid(&chain, &config));
                }
            }
        }
    }

    #[test]
    fn test_percent_columns_sum_to_hundred() {
        for seed in 10..20 {
            let chain = random_chain(seed);
            for y_axis in [YAxisMode::Strike, YAxisMode::Moneyness, YAxisMode::Delta] {
                for value in [ValueMode::OiPercent, ValueMode::VolumePercent] {
                    let grid = build_grid(&chain, &config(y_axis, value));
                    for c in 0..grid.columns().len() {
                        let values: Vec<f64> = grid.column_values(c).into_iter().flatten().collect();
                        if values.is_empty() {
                            continue;
                        }
                        let total: f64 = values.iter().sum();
                        assert!((total - 100.0).abs() < 1e-6, "column {} sums to {}", c, total);
                    }
                }
            }
        }
    }
}
