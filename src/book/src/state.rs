use crate::{ChangeNotifier, PriceLevelMap};
use dl_types::{ChangeHandler, CurrencyPair, DepthUpdate, Exchange, Side, TopOfBook};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct OrderBookState {
    bids: PriceLevelMap,
    asks: PriceLevelMap,
    top: TopOfBook,
}

impl OrderBookState {
    pub fn new() -> OrderBookState {
        OrderBookState::default()
    }

    pub fn apply_delta(&mut self, side: Side, price: Decimal, quantity: Decimal) {
        match side {
            Side::Bid => self.bids.set(price, quantity),
            Side::Ask => self.asks.set(price, quantity),
        }
        self.top = TopOfBook {
            best_bid: self.bids.highest(),
            best_ask: self.asks.lowest(),
        };
    }

    pub fn top_of_book(&self) -> TopOfBook {
        self.top
    }

    pub fn bids(&self) -> &PriceLevelMap {
        &self.bids
    }

    pub fn asks(&self) -> &PriceLevelMap {
        &self.asks
    }
}

/// Everything a single listener owns: a book per configured pair and the
/// notifier that reports their top of book.
pub struct ListenerState {
    exchange: Exchange,
    books: HashMap<CurrencyPair, OrderBookState>,
    notifier: ChangeNotifier,
}

impl ListenerState {
    pub fn new(
        exchange: Exchange,
        pairs: &[CurrencyPair],
        handler: Option<Arc<dyn ChangeHandler>>,
    ) -> ListenerState {
        ListenerState {
            exchange,
            books: pairs.iter().map(|p| (p.clone(), OrderBookState::new())).collect(),
            notifier: ChangeNotifier::new(handler),
        }
    }

    pub fn book(&self, pair: &CurrencyPair) -> Option<&OrderBookState> {
        self.books.get(pair)
    }

    /// Returns false if the pair was not configured for this listener.
    pub fn apply_delta(&mut self, pair: &CurrencyPair, side: Side, price: Decimal, quantity: Decimal) -> bool {
        match self.books.get_mut(pair) {
            Some(book) => {
                book.apply_delta(side, price, quantity);
                true
            }
            None => {
                warn!("{}: Ignoring update for unconfigured pair {pair}", self.exchange);
                false
            }
        }
    }

    pub fn top_of_book(&self, pair: &CurrencyPair) -> Option<TopOfBook> {
        self.books.get(pair).map(|b| b.top_of_book())
    }

    /// Applies every level of one message, then notifies once for the pair if
    /// at least one level was applied. Returns whether any level was applied.
    pub async fn apply(&mut self, update: DepthUpdate) -> bool {
        let Some(book) = self.books.get_mut(&update.pair) else {
            warn!("{}: Ignoring update for unconfigured pair {}", self.exchange, update.pair);
            return false;
        };

        if update.is_empty() {
            return false;
        }

        for level in &update.bids {
            book.apply_delta(Side::Bid, level.price, level.quantity);
        }
        for level in &update.asks {
            book.apply_delta(Side::Ask, level.price, level.quantity);
        }

        self.notify(&update.pair).await;
        true
    }

    /// Returns true if the handler was called.
    pub async fn notify(&mut self, pair: &CurrencyPair) -> bool {
        match self.books.get(pair) {
            Some(book) => {
                self.notifier
                    .notify(self.exchange, pair, book.top_of_book())
                    .await
            }
            None => false,
        }
    }
}
