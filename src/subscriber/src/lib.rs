use dl_exchanges_binance::{BinanceConfig, BinanceListener};
use dl_exchanges_okex::{OkexConfig, OkexListener};
use dl_types::{
    ChangeHandler, CurrencyPair, Exchange, ExchangeListener, ListenerError, TopOfBookChange,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CHANNEL_CAPACITY: usize = 1024;

/// Runs one listener per exchange over the same set of pairs. Listeners are
/// independent: one ending does not stop the others, and none is restarted.
pub struct Subscriber {
    exchanges: Vec<Exchange>,
    binance: BinanceConfig,
    okex: OkexConfig,
}

pub struct SubscriptionManager {
    changes: Receiver<Arc<TopOfBookChange>>,
    listeners: JoinHandle<()>,
}

impl Subscriber {
    pub fn new(exchanges: Vec<Exchange>, pairs: Vec<CurrencyPair>) -> Subscriber {
        Subscriber {
            exchanges,
            binance: BinanceConfig {
                pairs: pairs.clone(),
                ..BinanceConfig::default()
            },
            okex: OkexConfig {
                pairs,
                ..OkexConfig::default()
            },
        }
    }

    pub fn with_binance_url(mut self, url: String) -> Self {
        self.binance.url = url;
        self
    }

    pub fn with_okex_url(mut self, url: String) -> Self {
        self.okex.url = url;
        self
    }

    pub fn run(self, cancellation_token: CancellationToken) -> SubscriptionManager {
        let (sender, receiver) = channel(CHANNEL_CAPACITY);

        let listeners = tokio::spawn(self.run_async(sender, cancellation_token));

        SubscriptionManager {
            changes: receiver,
            listeners,
        }
    }

    async fn run_async(
        self,
        sender: Sender<Arc<TopOfBookChange>>,
        cancellation_token: CancellationToken,
    ) {
        let handler: Arc<dyn ChangeHandler> = Arc::new(sender);

        let mut tasks = Vec::new();
        for exchange in self.exchanges {
            let task = match exchange {
                Exchange::Binance => spawn_listener(
                    exchange,
                    BinanceListener::new(self.binance.clone(), Some(handler.clone())),
                    &cancellation_token,
                ),
                Exchange::Okex => spawn_listener(
                    exchange,
                    OkexListener::new(self.okex.clone(), Some(handler.clone())),
                    &cancellation_token,
                ),
            };
            tasks.extend(task);
        }
        drop(handler);

        for result in join_all(tasks).await {
            if let Err(error) = result {
                error!("Listener task failed: {error}");
            }
        }
    }
}

fn spawn_listener<L: ExchangeListener + 'static>(
    exchange: Exchange,
    listener: Result<L, ListenerError>,
    cancellation_token: &CancellationToken,
) -> Option<JoinHandle<()>> {
    match listener {
        Ok(listener) => Some(tokio::spawn(run_listener(listener, cancellation_token.clone()))),
        Err(error) => {
            error!("{exchange} listener not started: {error}");
            None
        }
    }
}

async fn run_listener<L: ExchangeListener>(listener: L, cancellation_token: CancellationToken) {
    let exchange = listener.exchange();
    info!("{exchange} listener started");

    match listener.run_async(cancellation_token).await {
        Ok(()) => info!("{exchange} listener stopped"),
        Err(error) => warn!("{exchange} listener terminated: {error}"),
    }
}

impl SubscriptionManager {
    pub fn subscribe_changes(&self) -> Receiver<Arc<TopOfBookChange>> {
        self.changes.resubscribe()
    }

    /// Completes once every listener has stopped. Must not be awaited again after
    /// it has completed.
    pub async fn wait(&mut self) {
        if let Err(error) = (&mut self.listeners).await {
            error!("Subscriber task failed: {error}");
        }
    }
}
