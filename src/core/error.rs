//! Error types for options liquidity analysis

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiquidityError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type LiquidityResult<T> = Result<T, LiquidityError>;

impl LiquidityError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
