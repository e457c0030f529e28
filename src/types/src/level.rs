use crate::{CurrencyPair, DecodeError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

/// New quantity available at a price. A zero quantity removes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Level {
    pub fn new(price: Decimal, quantity: Decimal) -> Level {
        Level { price, quantity }
    }
}

/// Every level carried by a single inbound message for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthUpdate {
    pub pair: CurrencyPair,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl DepthUpdate {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// A `[price, quantity, ...]` array as sent by exchanges. Prices and quantities
/// are usually strings but plain numbers are accepted, trailing fields are ignored.
#[derive(Debug, Deserialize)]
pub struct WireLevel(Vec<WireNumber>);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Text(String),
    Number(serde_json::Number),
}

impl WireNumber {
    fn to_decimal(&self) -> Result<Decimal, DecodeError> {
        let text = match self {
            WireNumber::Text(s) => s.clone(),
            WireNumber::Number(n) => n.to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| DecodeError::InvalidNumber(text))
    }
}

impl WireLevel {
    pub fn to_level(&self) -> Result<Level, DecodeError> {
        match self.0.as_slice() {
            [price, quantity, ..] => Ok(Level {
                price: price.to_decimal()?,
                quantity: quantity.to_decimal()?,
            }),
            fields => Err(DecodeError::InvalidLevel(fields.len())),
        }
    }
}

pub fn decode_levels(levels: &[WireLevel]) -> Result<Vec<Level>, DecodeError> {
    levels.iter().map(|l| l.to_level()).collect()
}
