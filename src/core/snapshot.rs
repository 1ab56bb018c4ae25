//! Chain snapshots
//!
//! A `ChainSnapshot` is every retained contract of one underlying at one
//! observation time. It never changes after construction; filtering hands
//! back a new snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::contract::{ContractQuote, ContractRecord, OptionSide, OptionType};

/// Serialized snapshot payload, as written by a fetch layer or the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainData {
    /// Underlying symbol
    pub underlying_symbol: String,
    /// Underlying price at fetch time
    pub underlying_price: f64,
    /// When the chain was fetched
    pub fetch_timestamp: DateTime<Utc>,
    /// All contracts
    #[serde(default)]
    pub contracts: Vec<ContractQuote>,
}

/// Conjunctive record filter; all bounds are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFilter {
    pub min_dte: i64,
    pub max_dte: i64,
    pub min_moneyness: f64,
    pub max_moneyness: f64,
    pub option_type: OptionSide,
}

impl SnapshotFilter {
    /// Filter that keeps every record with a finite moneyness
    pub fn unbounded() -> Self {
        Self {
            min_dte: i64::MIN,
            max_dte: i64::MAX,
            min_moneyness: f64::NEG_INFINITY,
            max_moneyness: f64::INFINITY,
            option_type: OptionSide::Both,
        }
    }

    pub fn matches(&self, record: &ContractRecord) -> bool {
        let dte = record.days_to_expiration();
        let moneyness = record.moneyness();

        self.option_type.matches(record.option_type())
            && dte >= self.min_dte
            && dte <= self.max_dte
            && moneyness >= self.min_moneyness
            && moneyness <= self.max_moneyness
    }
}

/// Immutable set of contract records for one underlying
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSnapshot {
    underlying_symbol: String,
    observed_at: DateTime<Utc>,
    underlying_price: f64,
    records: Vec<ContractRecord>,
}

impl ChainSnapshot {
    /// Assemble a snapshot from already-normalized records
    pub fn new(
        underlying_symbol: impl Into<String>,
        observed_at: DateTime<Utc>,
        underlying_price: f64,
        records: Vec<ContractRecord>,
    ) -> Self {
        Self {
            underlying_symbol: underlying_symbol.into(),
            observed_at,
            underlying_price,
            records,
        }
    }

    /// Normalize a raw payload: compute DTE against the fetch date and drop
    /// contracts that already expired
    pub fn from_raw(data: ChainData) -> Self {
        let observed_on = data.fetch_timestamp.date_naive();
        let mut expired = 0usize;
        let mut records = Vec::with_capacity(data.contracts.len());

        for quote in &data.contracts {
            let record = ContractRecord::from_quote(quote, data.underlying_price, observed_on);
            if record.days_to_expiration() < 0 {
                expired += 1;
                continue;
            }
            if !record.is_quote_valid() {
                tracing::warn!(
                    "{}: bid {} / ask {} / strike {} / spot {} excluded from spread figures",
                    record.symbol(),
                    record.bid(),
                    record.ask(),
                    record.strike(),
                    record.underlying_price()
                );
            }
            records.push(record);
        }

        if expired > 0 {
            tracing::debug!(
                "Dropped {} expired contracts from {} snapshot",
                expired,
                data.underlying_symbol
            );
        }

        Self {
            underlying_symbol: data.underlying_symbol,
            observed_at: data.fetch_timestamp,
            underlying_price: data.underlying_price,
            records,
        }
    }

    /// Serializable payload for this snapshot
    ///
    /// Greeks other than delta and last prices are not kept on records, so
    /// they come back empty.
    pub fn to_raw(&self) -> ChainData {
        let contracts = self
            .records
            .iter()
            .map(|r| ContractQuote {
                symbol: r.symbol().to_string(),
                underlying_symbol: self.underlying_symbol.clone(),
                expiration: r.expiration(),
                strike: r.strike(),
                option_type: r.option_type(),
                open_interest: r.open_interest(),
                volume: r.volume(),
                bid: r.bid(),
                ask: r.ask(),
                last_price: 0.0,
                delta: Some(r.delta()),
                gamma: None,
                theta: None,
                vega: None,
                implied_volatility: None,
            })
            .collect();

        ChainData {
            underlying_symbol: self.underlying_symbol.clone(),
            underlying_price: self.underlying_price,
            fetch_timestamp: self.observed_at,
            contracts,
        }
    }

    pub fn underlying_symbol(&self) -> &str {
        &self.underlying_symbol
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn underlying_price(&self) -> f64 {
        self.underlying_price
    }

    pub fn records(&self) -> &[ContractRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New snapshot with only the records passing `filter`
    pub fn filtered(&self, filter: &SnapshotFilter) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        Self {
            underlying_symbol: self.underlying_symbol.clone(),
            observed_at: self.observed_at,
            underlying_price: self.underlying_price,
            records,
        }
    }

    /// Distinct expirations, ascending
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.records.iter().map(|r| r.expiration()).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Distinct strikes, ascending
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.records.iter().map(|r| r.strike()).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();
        strikes
    }

    pub fn calls(&self) -> Vec<&ContractRecord> {
        self.of_type(OptionType::Call)
    }

    pub fn puts(&self) -> Vec<&ContractRecord> {
        self.of_type(OptionType::Put)
    }

    fn of_type(&self, option_type: OptionType) -> Vec<&ContractRecord> {
        self.records
            .iter()
            .filter(|r| r.option_type() == option_type)
            .collect()
    }

    /// Records expiring on `expiration`
    pub fn for_expiration(&self, expiration: NaiveDate) -> Vec<&ContractRecord> {
        self.records
            .iter()
            .filter(|r| r.expiration() == expiration)
            .collect()
    }

    /// Records struck exactly at `strike`
    pub fn for_strike(&self, strike: f64) -> Vec<&ContractRecord> {
        self.records.iter().filter(|r| r.strike() == strike).collect()
    }
}
