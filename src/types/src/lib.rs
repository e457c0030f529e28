use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast::Sender;
use tokio_util::sync::CancellationToken;
use tracing::trace;

mod endpoint;
mod error;
mod level;
mod pair;
mod phase;

pub use endpoint::parse_endpoint;
pub use error::{DecodeError, ExchangeParseError, ListenerError, PairParseError};
pub use level::{decode_levels, DepthUpdate, Level, Side, WireLevel};
pub use pair::{CurrencyPair, PairSymbols};
pub use phase::{ListenerPhase, PhaseEvent};
pub use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Binance,
    Okex,
}

impl Exchange {
    /// The identity reported alongside every top-of-book change.
    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Okex => "okex",
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exchange {
    type Err = ExchangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Exchange::Binance),
            "okex" => Ok(Exchange::Okex),
            _ => Err(ExchangeParseError(s.to_string())),
        }
    }
}

/// Protocol adapter for a single exchange. Each implementation owns the state of
/// the pairs it was configured with and nothing else.
#[async_trait]
pub trait ExchangeListener: Send + Sized {
    fn exchange(&self) -> Exchange;

    fn encode_pair(&self, pair: &CurrencyPair) -> String;

    fn decode_pair(&self, symbol: &str) -> Option<CurrencyPair>;

    /// Streams depth updates until the connection ends or the token is cancelled.
    /// The connection is never re-established.
    async fn run_async(self, cancellation_token: CancellationToken) -> Result<(), ListenerError>;
}

#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_changed(&self, change: TopOfBookChange);
}

#[async_trait]
impl ChangeHandler for Sender<Arc<TopOfBookChange>> {
    async fn on_changed(&self, change: TopOfBookChange) {
        if self.send(Arc::new(change)).is_err() {
            trace!("No receivers for top of book change");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl TopOfBook {
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopOfBookChange {
    pub exchange: Exchange,
    pub pair: CurrencyPair,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl TopOfBookChange {
    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.best_bid,
            best_ask: self.best_ask,
        }
    }
}
