use crate::CurrencyPair;
use thiserror::Error;

/// A frame that could not be turned into a depth update. The frame is dropped.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to inflate frame: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("failed to parse frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("expected [price, quantity], got {0} fields")]
    InvalidLevel(usize),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ListenerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("pairs {first} and {second} both map to symbol '{symbol}'")]
    SymbolCollision {
        symbol: String,
        first: CurrencyPair,
        second: CurrencyPair,
    },

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid currency pair '{0}', expected BASE/QUOTE")]
pub struct PairParseError(pub String);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown exchange '{0}'")]
pub struct ExchangeParseError(pub String);
