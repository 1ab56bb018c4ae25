//! Core data types for options liquidity analysis
//!
//! Defines fundamental types:
//! - ContractQuote / ContractRecord: raw and normalized contract observations
//! - ChainSnapshot: immutable chain for one underlying at one time
//! - Numeric helpers shared by bucketing and statistics

pub mod contract;
pub mod error;
pub mod numeric;
pub mod snapshot;

pub use contract::*;
pub use error::*;
pub use numeric::*;
pub use snapshot::*;
