use async_trait::async_trait;
use dl_book::ListenerState;
use dl_types::{
    decode_levels, ChangeHandler, CurrencyPair, DecodeError, DepthUpdate, Exchange, ExchangeListener,
    parse_endpoint, ListenerError, ListenerPhase, PairSymbols, PhaseEvent, WireLevel,
};
use ezsockets::client::ClientCloseMode;
use ezsockets::{ClientConfig, ClientExt, CloseFrame, Error, WSError};
use serde::Deserialize;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

pub const URL: &str = "wss://stream.binance.com:9443";

const DEPTH_STREAM: &str = "depth.b10";

#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub pairs: Vec<CurrencyPair>,
    pub url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        BinanceConfig {
            pairs: Vec::new(),
            url: URL.to_string(),
        }
    }
}

/// Listens to the combined depth streams of every configured pair. The streams are
/// listed in the connection URL so no subscription message is sent.
pub struct BinanceListener {
    url: String,
    symbols: PairSymbols,
    state: ListenerState,
}

impl BinanceListener {
    pub fn new(
        config: BinanceConfig,
        handler: Option<Arc<dyn ChangeHandler>>,
    ) -> Result<BinanceListener, ListenerError> {
        parse_endpoint(&config.url)?;

        let symbols = PairSymbols::new(&config.pairs, to_symbol)?;
        if symbols.is_empty() {
            warn!("Binance: No pairs configured, no depth updates will arrive");
        }

        Ok(BinanceListener {
            url: config.url,
            symbols,
            state: ListenerState::new(Exchange::Binance, &config.pairs, handler),
        })
    }

    pub fn stream_url(&self) -> String {
        let streams: Vec<_> = self
            .symbols
            .symbols()
            .into_iter()
            .map(|s| format!("{s}@{DEPTH_STREAM}"))
            .collect();

        format!(
            "{}/stream?streams={}",
            self.url.trim_end_matches('/'),
            streams.join("/")
        )
    }

    pub fn state(&self) -> &ListenerState {
        &self.state
    }

    /// Returns true if the frame carried at least one level for a configured pair.
    pub async fn process_text(&mut self, text: &str) -> bool {
        trace!("Binance: Received text: {text}");

        match self.decode_frame(text) {
            Ok(update) => self.state.apply(update).await,
            Err(error) => {
                debug!("Binance: Skipping frame: {error}");
                false
            }
        }
    }

    fn decode_frame(&self, text: &str) -> Result<DepthUpdate, DecodeError> {
        let StreamMessage { data } = serde_json::from_str(text)?;
        let pair = self
            .decode_pair(&data.symbol)
            .ok_or(DecodeError::UnknownSymbol(data.symbol))?;

        Ok(DepthUpdate {
            pair,
            bids: decode_levels(&data.bids)?,
            asks: decode_levels(&data.asks)?,
        })
    }
}

fn to_symbol(pair: &CurrencyPair) -> String {
    format!("{}{}", pair.base(), pair.quote()).to_ascii_lowercase()
}

struct WebSocketClient {
    listener: BinanceListener,
    phase: ListenerPhase,
}

impl WebSocketClient {
    fn transition(&mut self, event: PhaseEvent) {
        let next = self.phase.next(event);
        if next != self.phase {
            info!("Binance: {:?} -> {next:?}", self.phase);
            self.phase = next;
        }
    }
}

#[async_trait]
impl ClientExt for WebSocketClient {
    type Call = ();

    async fn on_text(&mut self, text: String) -> Result<(), Error> {
        self.listener.process_text(&text).await;
        Ok(())
    }

    async fn on_binary(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        debug!("Binance: Skipping binary frame of {} bytes", bytes.len());
        Ok(())
    }

    async fn on_call(&mut self, _: Self::Call) -> Result<(), Error> {
        Ok(())
    }

    async fn on_connect(&mut self) -> Result<(), Error> {
        info!("Binance: Connected");
        self.transition(PhaseEvent::Connected);
        self.transition(PhaseEvent::Subscribed);
        Ok(())
    }

    async fn on_connect_fail(&mut self, error: WSError) -> Result<ClientCloseMode, Error> {
        error!("Binance: Failed to connect: {error:?}");
        self.transition(PhaseEvent::Disconnected);
        Err(error.into())
    }

    async fn on_close(&mut self, frame: Option<CloseFrame>) -> Result<ClientCloseMode, Error> {
        info!("Binance: Connection closed: {frame:?}");
        self.transition(PhaseEvent::Disconnected);
        Ok(ClientCloseMode::Close)
    }

    async fn on_disconnect(&mut self) -> Result<ClientCloseMode, Error> {
        warn!("Binance: Disconnected");
        self.transition(PhaseEvent::Disconnected);
        Ok(ClientCloseMode::Close)
    }
}

#[async_trait]
impl ExchangeListener for BinanceListener {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn encode_pair(&self, pair: &CurrencyPair) -> String {
        to_symbol(pair)
    }

    fn decode_pair(&self, symbol: &str) -> Option<CurrencyPair> {
        self.symbols.pair(&symbol.to_ascii_lowercase()).cloned()
    }

    async fn run_async(self, cancellation_token: CancellationToken) -> Result<(), ListenerError> {
        let url = self.stream_url();
        info!("Binance: Connecting to {url}");

        let (handle, future) = ezsockets::connect(
            |_| WebSocketClient {
                listener: self,
                phase: ListenerPhase::default(),
            },
            ClientConfig::new(url.as_str()),
        )
        .await;

        let result = select! {
            result = future => result.map_err(|e| ListenerError::Transport(e.to_string())),
            _ = cancellation_token.cancelled() => {
                if handle.close(None).is_err() {
                    warn!("Binance: Connection already closed");
                }
                Ok(())
            }
        };

        info!("Binance disconnected");
        result
    }
}

#[derive(Deserialize)]
struct StreamMessage {
    data: DepthData,
}

#[derive(Deserialize)]
struct DepthData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bids: Vec<WireLevel>,
    #[serde(rename = "a")]
    asks: Vec<WireLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_types::TopOfBookChange;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use test_case::test_case;
    use tokio::sync::broadcast::{channel, Receiver};

    fn config(pairs: &[&str]) -> BinanceConfig {
        BinanceConfig {
            pairs: pairs.iter().map(|p| CurrencyPair::from_str(p).unwrap()).collect(),
            ..BinanceConfig::default()
        }
    }

    fn listener(pairs: &[&str]) -> (BinanceListener, Receiver<Arc<TopOfBookChange>>) {
        let (sender, receiver) = channel(16);
        let listener = BinanceListener::new(config(pairs), Some(Arc::new(sender))).unwrap();
        (listener, receiver)
    }

    fn frame(symbol: &str, bids: &str, asks: &str) -> String {
        format!(
            r#"{{"stream":"{}@depth","data":{{"e":"depthUpdate","E":1,"s":"{symbol}","U":1,"u":2,"b":{bids},"a":{asks}}}}}"#,
            symbol.to_lowercase()
        )
    }

    #[test]
    fn stream_url_lists_every_pair() {
        let (listener, _) = listener(&["ETH/BTC", "BTC/USDT"]);

        assert_eq!(
            listener.stream_url(),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@depth.b10/ethbtc@depth.b10"
        );
    }

    #[test_case("BTC/USDT", "btcusdt")]
    #[test_case("DOGE/USDT", "dogeusdt")]
    #[test_case("ETH/BTC", "ethbtc")]
    fn pair_symbols_round_trip(pair: &str, symbol: &str) {
        let (listener, _) = listener(&["BTC/USDT", "DOGE/USDT", "ETH/BTC"]);
        let pair = CurrencyPair::from_str(pair).unwrap();

        assert_eq!(listener.encode_pair(&pair), symbol);
        assert_eq!(listener.decode_pair(&listener.encode_pair(&pair)), Some(pair.clone()));
        assert_eq!(listener.decode_pair(&symbol.to_uppercase()), Some(pair));
    }

    #[test]
    fn unconfigured_symbol_does_not_decode() {
        let (listener, _) = listener(&["BTC/USDT"]);
        assert_eq!(listener.decode_pair("ETHUSDT"), None);
    }

    #[test_case("BTC/USDT", "BTCU/SDT", "btcusdt")]
    #[test_case("ETH/BTC", "E/THBTC", "ethbtc")]
    fn pairs_sharing_a_symbol_are_rejected(first: &str, second: &str, symbol: &str) {
        let result = BinanceListener::new(config(&[first, second]), None);

        assert!(matches!(
            result,
            Err(ListenerError::SymbolCollision { symbol: s, .. }) if s == symbol
        ));
    }

    #[test_case("ws://")]
    #[test_case("ws://[x")]
    #[test_case("https://stream.binance.com")]
    fn invalid_url_is_rejected(url: &str) {
        let config = BinanceConfig {
            url: url.to_string(),
            ..config(&["BTC/USDT"])
        };

        assert!(matches!(
            BinanceListener::new(config, None),
            Err(ListenerError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_without_reconnecting() {
        let config = BinanceConfig {
            url: "ws://127.0.0.1:1".to_string(),
            ..config(&["BTC/USDT"])
        };
        let listener = BinanceListener::new(config, None).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            listener.run_async(CancellationToken::new()),
        )
        .await;

        assert!(matches!(result, Ok(Err(ListenerError::Transport(_)))));
    }

    #[tokio::test]
    async fn removing_best_bid_is_reported() {
        let (mut listener, mut receiver) = listener(&["BTC/USDT"]);
        let pair = CurrencyPair::new("BTC", "USDT");

        assert!(
            listener
                .process_text(&frame("BTCUSDT", r#"[["100","1"]]"#, r#"[["101","1"]]"#))
                .await
        );
        assert!(
            listener
                .process_text(&frame("BTCUSDT", r#"[["100","0"]]"#, r#"[["101","1"]]"#))
                .await
        );

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.exchange, Exchange::Binance);
        assert_eq!(first.pair, pair);
        assert_eq!((first.best_bid, first.best_ask), (Some(dec!(100)), Some(dec!(101))));

        let second = receiver.try_recv().unwrap();
        assert_eq!((second.best_bid, second.best_ask), (None, Some(dec!(101))));

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unchanged_top_of_book_is_not_reported() {
        let (mut listener, mut receiver) = listener(&["BTC/USDT"]);

        listener
            .process_text(&frame("BTCUSDT", r#"[["100","1"]]"#, r#"[["101","1"]]"#))
            .await;
        listener
            .process_text(&frame("BTCUSDT", r#"[["99","4"]]"#, r#"[["101","2"]]"#))
            .await;

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
        assert_eq!(
            listener.state().book(&CurrencyPair::new("BTC", "USDT")).unwrap().bids().len(),
            2
        );
    }

    #[test_case("not json")]
    #[test_case(r#"{"result":null,"id":1}"#)]
    #[test_case(r#"{"data":{"s":"ETHUSDT","b":[["1","1"]],"a":[]}}"#)]
    #[test_case(r#"{"data":{"s":"BTCUSDT","b":[["abc","1"]],"a":[]}}"#)]
    #[test_case(r#"{"data":{"s":"BTCUSDT","b":[],"a":[]}}"#)]
    #[tokio::test]
    async fn unexpected_frames_are_skipped(text: &str) {
        let (mut listener, mut receiver) = listener(&["BTC/USDT"]);

        assert!(!listener.process_text(text).await);
        assert!(receiver.try_recv().is_err());
    }
}
