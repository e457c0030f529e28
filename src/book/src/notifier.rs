use dl_types::{ChangeHandler, CurrencyPair, Exchange, TopOfBook, TopOfBookChange};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Dispatches a pair's top of book to the handler whenever it differs from the
/// one dispatched last. Pairs start with both sides unset.
pub struct ChangeNotifier {
    handler: Option<Arc<dyn ChangeHandler>>,
    last_notified: HashMap<CurrencyPair, TopOfBook>,
}

impl ChangeNotifier {
    pub fn new(handler: Option<Arc<dyn ChangeHandler>>) -> ChangeNotifier {
        ChangeNotifier {
            handler,
            last_notified: HashMap::new(),
        }
    }

    /// Returns true if a change was detected. The handler has completed by the
    /// time this returns.
    pub async fn notify(&mut self, exchange: Exchange, pair: &CurrencyPair, current: TopOfBook) -> bool {
        let last = self.last_notified.get(pair).copied().unwrap_or_default();
        if last == current {
            return false;
        }

        self.last_notified.insert(pair.clone(), current);
        trace!("{exchange}: {pair} top of book changed: {current:?}");

        if let Some(handler) = &self.handler {
            handler
                .on_changed(TopOfBookChange {
                    exchange,
                    pair: pair.clone(),
                    best_bid: current.best_bid,
                    best_ask: current.best_ask,
                })
                .await;
        }
        true
    }

    pub fn last_notified(&self, pair: &CurrencyPair) -> TopOfBook {
        self.last_notified.get(pair).copied().unwrap_or_default()
    }
}
