//! Option contract records
//!
//! `ContractQuote` is the raw observation handed over by a fetch layer.
//! `ContractRecord` is the normalized, immutable form the engine works on,
//! with mid and spread figures computed once at construction.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{LiquidityError, LiquidityResult};

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn label(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Option type selection for filters: one side of the chain or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
    #[default]
    Both,
}

impl OptionSide {
    /// Does a contract of this type pass the selection?
    pub fn matches(&self, option_type: OptionType) -> bool {
        match self {
            OptionSide::Call => option_type == OptionType::Call,
            OptionSide::Put => option_type == OptionType::Put,
            OptionSide::Both => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALLS",
            OptionSide::Put => "PUTS",
            OptionSide::Both => "CALLS + PUTS",
        }
    }
}

impl From<OptionType> for OptionSide {
    fn from(option_type: OptionType) -> Self {
        match option_type {
            OptionType::Call => OptionSide::Call,
            OptionType::Put => OptionSide::Put,
        }
    }
}

impl FromStr for OptionSide {
    type Err = LiquidityError;

    fn from_str(s: &str) -> LiquidityResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "calls" => Ok(OptionSide::Call),
            "put" | "puts" => Ok(OptionSide::Put),
            "both" => Ok(OptionSide::Both),
            other => Err(LiquidityError::configuration(format!(
                "unknown option type '{}' (expected call, put or both)",
                other
            ))),
        }
    }
}

/// One option contract as delivered by a market-data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractQuote {
    /// OCC contract symbol (e.g. "SPY250620C00500000")
    pub symbol: String,
    /// Underlying symbol
    pub underlying_symbol: String,
    /// Expiration date
    pub expiration: NaiveDate,
    /// Strike price
    pub strike: f64,
    /// Call or put
    pub option_type: OptionType,
    /// Open interest
    #[serde(default)]
    pub open_interest: u64,
    /// Session volume
    #[serde(default)]
    pub volume: u64,
    /// Best bid (0 when no quote)
    #[serde(default)]
    pub bid: f64,
    /// Best ask (0 when no quote)
    #[serde(default)]
    pub ask: f64,
    /// Last trade price
    #[serde(default)]
    pub last_price: f64,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

/// Normalized contract observation with derived quote figures
///
/// Fields are private so the memoized figures cannot drift from the
/// prices they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractRecord {
    symbol: String,
    underlying_price: f64,
    option_type: OptionType,
    strike: f64,
    expiration: NaiveDate,
    days_to_expiration: i64,
    open_interest: u64,
    volume: u64,
    bid: f64,
    ask: f64,
    delta: f64,
    moneyness: f64,
    quote_valid: bool,
    mid: f64,
    spread_absolute: Option<f64>,
    spread_percent: Option<f64>,
    spread_per_delta: Option<f64>,
}

impl ContractRecord {
    /// Build a record from a raw quote observed on `observed_on`
    ///
    /// A missing delta is taken as 0. Quotes with `ask < bid`, negative or
    /// non-finite prices, or a non-positive strike/underlying are kept for
    /// open interest and volume but get no spread figures.
    pub fn from_quote(quote: &ContractQuote, underlying_price: f64, observed_on: NaiveDate) -> Self {
        let days_to_expiration = (quote.expiration - observed_on).num_days();
        let delta = quote.delta.filter(|d| d.is_finite()).unwrap_or(0.0);
        let moneyness = quote.strike / underlying_price;

        let quote_valid = quote.bid.is_finite()
            && quote.ask.is_finite()
            && quote.bid >= 0.0
            && quote.ask >= quote.bid
            && quote.strike > 0.0
            && underlying_price > 0.0;

        let mid = (quote.bid + quote.ask) / 2.0;

        let (spread_absolute, spread_percent, spread_per_delta) = if quote_valid {
            let spread = quote.ask - quote.bid;
            let percent = if mid > 0.0 { Some(spread / mid) } else { None };
            let per_delta = if delta != 0.0 {
                Some(spread / delta.abs())
            } else {
                None
            };
            (Some(spread), percent, per_delta)
        } else {
            (None, None, None)
        };

        Self {
            symbol: quote.symbol.clone(),
            underlying_price,
            option_type: quote.option_type,
            strike: quote.strike,
            expiration: quote.expiration,
            days_to_expiration,
            open_interest: quote.open_interest,
            volume: quote.volume,
            bid: quote.bid,
            ask: quote.ask,
            delta,
            moneyness,
            quote_valid,
            mid,
            spread_absolute,
            spread_percent,
            spread_per_delta,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn underlying_price(&self) -> f64 {
        self.underlying_price
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn expiration(&self) -> NaiveDate {
        self.expiration
    }

    pub fn days_to_expiration(&self) -> i64 {
        self.days_to_expiration
    }

    pub fn open_interest(&self) -> u64 {
        self.open_interest
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    pub fn bid(&self) -> f64 {
        self.bid
    }

    pub fn ask(&self) -> f64 {
        self.ask
    }

    /// Signed delta (0 when the provider sent none)
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Strike / underlying price
    pub fn moneyness(&self) -> f64 {
        self.moneyness
    }

    /// Whether bid/ask support spread calculations at all
    pub fn is_quote_valid(&self) -> bool {
        self.quote_valid
    }

    /// Valid quote with a positive mid; only quoted records enter spread
    /// averages, rankings and spread grid cells
    pub fn is_quoted(&self) -> bool {
        self.spread_percent.is_some()
    }

    /// (bid + ask) / 2
    pub fn mid(&self) -> f64 {
        self.mid
    }

    /// ask - bid, None for quote-invalid records
    pub fn spread_absolute(&self) -> Option<f64> {
        self.spread_absolute
    }

    /// Spread as a fraction of mid, None when mid is 0
    pub fn spread_percent(&self) -> Option<f64> {
        self.spread_percent
    }

    /// Spread per unit of |delta|, None when delta is 0
    pub fn spread_per_delta(&self) -> Option<f64> {
        self.spread_per_delta
    }
}
