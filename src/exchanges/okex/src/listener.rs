use crate::serialize_to_json;
use async_trait::async_trait;
use dl_book::ListenerState;
use dl_types::{
    decode_levels, ChangeHandler, CurrencyPair, DecodeError, DepthUpdate, Exchange, ExchangeListener,
    parse_endpoint, ListenerError, ListenerPhase, PairSymbols, PhaseEvent, WireLevel,
};
use ezsockets::client::ClientCloseMode;
use ezsockets::{ClientConfig, ClientExt, CloseFrame, Error, MessageSignal, WSError};
use flate2::bufread::DeflateDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

pub const URL: &str = "wss://okexcomreal.bafang.com:8443/ws/v3";

const DEPTH_CHANNEL: &str = "spot/optimized_depth";

#[derive(Debug, Clone)]
pub struct OkexConfig {
    pub pairs: Vec<CurrencyPair>,
    pub url: String,
}

impl Default for OkexConfig {
    fn default() -> Self {
        OkexConfig {
            pairs: Vec::new(),
            url: URL.to_string(),
        }
    }
}

/// Subscribes to one optimized depth channel per configured pair. Every frame the
/// exchange sends is raw deflate compressed JSON.
pub struct OkexListener {
    url: String,
    symbols: PairSymbols,
    state: ListenerState,
}

impl OkexListener {
    pub fn new(
        config: OkexConfig,
        handler: Option<Arc<dyn ChangeHandler>>,
    ) -> Result<OkexListener, ListenerError> {
        parse_endpoint(&config.url)?;

        let symbols = PairSymbols::new(&config.pairs, to_symbol)?;
        if symbols.is_empty() {
            warn!("OKEx: No pairs configured, subscribing to nothing");
        }

        Ok(OkexListener {
            url: config.url,
            symbols,
            state: ListenerState::new(Exchange::Okex, &config.pairs, handler),
        })
    }

    pub fn topics(&self) -> Vec<String> {
        self.symbols
            .symbols()
            .into_iter()
            .map(|s| format!("{DEPTH_CHANNEL}:{s}"))
            .collect()
    }

    pub fn state(&self) -> &ListenerState {
        &self.state
    }

    /// Returns true if the frame carried at least one level for a configured pair.
    pub async fn process_binary(&mut self, bytes: &[u8]) -> bool {
        match self.decode_frame(bytes) {
            Ok(Some(update)) => self.state.apply(update).await,
            Ok(None) => false,
            Err(error) => {
                debug!("OKEx: Skipping frame: {error}");
                false
            }
        }
    }

    fn decode_frame(&self, bytes: &[u8]) -> Result<Option<DepthUpdate>, DecodeError> {
        let text = inflate(bytes)?;
        trace!("OKEx: Received text: {text}");

        match serde_json::from_str(&text)? {
            Frame::Table(TableMessage { table, data }) => {
                let Some(depth) = data.into_iter().next() else {
                    debug!("OKEx: Empty {table} message");
                    return Ok(None);
                };
                let pair = self
                    .decode_pair(&depth.instrument_id)
                    .ok_or(DecodeError::UnknownSymbol(depth.instrument_id))?;

                Ok(Some(DepthUpdate {
                    pair,
                    bids: decode_levels(&depth.bids)?,
                    asks: decode_levels(&depth.asks)?,
                }))
            }
            Frame::Event(event) => {
                match event.event.as_str() {
                    "subscribe" => info!("OKEx: Subscribed to {}", event.channel.unwrap_or_default()),
                    "error" => warn!(
                        "OKEx: Error event: {} (code {:?})",
                        event.message.unwrap_or_default(),
                        event.error_code
                    ),
                    other => debug!("OKEx: Ignoring {other} event"),
                }
                Ok(None)
            }
        }
    }
}

fn to_symbol(pair: &CurrencyPair) -> String {
    format!("{}-{}", pair.base(), pair.quote())
}

fn inflate(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

struct WebSocketClient {
    handle: ezsockets::Client<Self>,
    listener: OkexListener,
    phase: ListenerPhase,
}

impl WebSocketClient {
    fn send<S: Serialize>(&mut self, value: &S) -> Result<MessageSignal, Error> {
        let json = serialize_to_json(value)?;
        trace!("OKEx: Sending message: {json}");
        self.handle.text(json).map_err(|e| e.into())
    }

    fn subscribe(&mut self) -> Result<MessageSignal, Error> {
        let args = self.listener.topics();
        self.send(&Subscribe {
            op: "subscribe".to_string(),
            args,
        })
    }

    fn transition(&mut self, event: PhaseEvent) {
        let next = self.phase.next(event);
        if next != self.phase {
            info!("OKEx: {:?} -> {next:?}", self.phase);
            self.phase = next;
        }
    }
}

#[async_trait]
impl ClientExt for WebSocketClient {
    type Call = ();

    async fn on_text(&mut self, text: String) -> Result<(), Error> {
        debug!("OKEx: Skipping text frame: {text}");
        Ok(())
    }

    async fn on_binary(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        self.listener.process_binary(&bytes).await;
        Ok(())
    }

    async fn on_call(&mut self, _: Self::Call) -> Result<(), Error> {
        Ok(())
    }

    async fn on_connect(&mut self) -> Result<(), Error> {
        info!("OKEx: Connected");
        self.transition(PhaseEvent::Connected);
        self.subscribe()?;
        self.transition(PhaseEvent::Subscribed);
        Ok(())
    }

    async fn on_connect_fail(&mut self, error: WSError) -> Result<ClientCloseMode, Error> {
        error!("OKEx: Failed to connect: {error:?}");
        self.transition(PhaseEvent::Disconnected);
        Err(error.into())
    }

    async fn on_close(&mut self, frame: Option<CloseFrame>) -> Result<ClientCloseMode, Error> {
        info!("OKEx: Connection closed: {frame:?}");
        self.transition(PhaseEvent::Disconnected);
        Ok(ClientCloseMode::Close)
    }

    async fn on_disconnect(&mut self) -> Result<ClientCloseMode, Error> {
        warn!("OKEx: Disconnected");
        self.transition(PhaseEvent::Disconnected);
        Ok(ClientCloseMode::Close)
    }
}

#[async_trait]
impl ExchangeListener for OkexListener {
    fn exchange(&self) -> Exchange {
        Exchange::Okex
    }

    fn encode_pair(&self, pair: &CurrencyPair) -> String {
        to_symbol(pair)
    }

    fn decode_pair(&self, symbol: &str) -> Option<CurrencyPair> {
        self.symbols.pair(&symbol.to_ascii_uppercase()).cloned()
    }

    async fn run_async(self, cancellation_token: CancellationToken) -> Result<(), ListenerError> {
        info!("OKEx: Connecting to {}", self.url);
        let config = ClientConfig::new(self.url.as_str());

        let (handle, future) = ezsockets::connect(
            |handle| WebSocketClient {
                handle,
                listener: self,
                phase: ListenerPhase::default(),
            },
            config,
        )
        .await;

        let result = select! {
            result = future => result.map_err(|e| ListenerError::Transport(e.to_string())),
            _ = cancellation_token.cancelled() => {
                if handle.close(None).is_err() {
                    warn!("OKEx: Connection already closed");
                }
                Ok(())
            }
        };

        info!("OKEx disconnected");
        result
    }
}

#[derive(Serialize)]
struct Subscribe {
    op: String,
    args: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Frame {
    Table(TableMessage),
    Event(EventMessage),
}

#[derive(Deserialize)]
struct TableMessage {
    table: String,
    data: Vec<DepthData>,
}

#[derive(Deserialize)]
struct DepthData {
    instrument_id: String,
    bids: Vec<WireLevel>,
    asks: Vec<WireLevel>,
}

#[derive(Deserialize)]
struct EventMessage {
    event: String,
    channel: Option<String>,
    message: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<serde_json::Value>,
}
