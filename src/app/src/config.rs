use dl_types::{
    parse_endpoint, CurrencyPair, Exchange, ExchangeParseError, ListenerError, PairParseError,
};
use std::str::FromStr;
use thiserror::Error;

const PAIRS: &str = "DL_PAIRS";
const EXCHANGES: &str = "DL_EXCHANGES";
const BINANCE_URL: &str = "DL_BINANCE_URL";
const OKEX_URL: &str = "DL_OKEX_URL";

const DEFAULT_PAIRS: &str = "BTC/USDT";
const DEFAULT_EXCHANGES: &str = "binance,okex";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DL_PAIRS: {0}")]
    Pair(#[from] PairParseError),

    #[error("DL_EXCHANGES: {0}")]
    Exchange(#[from] ExchangeParseError),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0}: {1}")]
    Url(&'static str, ListenerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub pairs: Vec<CurrencyPair>,
    pub exchanges: Vec<Exchange>,
    pub binance_url: Option<String>,
    pub okex_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<AppConfig, ConfigError> {
        let pairs = parse_list(&lookup(PAIRS).unwrap_or_else(|| DEFAULT_PAIRS.to_string()))?;
        if pairs.is_empty() {
            return Err(ConfigError::Empty(PAIRS));
        }

        let exchanges =
            parse_list(&lookup(EXCHANGES).unwrap_or_else(|| DEFAULT_EXCHANGES.to_string()))?;
        if exchanges.is_empty() {
            return Err(ConfigError::Empty(EXCHANGES));
        }

        Ok(AppConfig {
            pairs,
            exchanges,
            binance_url: parse_url(BINANCE_URL, lookup(BINANCE_URL))?,
            okex_url: parse_url(OKEX_URL, lookup(OKEX_URL))?,
        })
    }
}

fn parse_list<T: FromStr>(value: &str) -> Result<Vec<T>, T::Err> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(T::from_str)
        .collect()
}

fn parse_url(key: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        None => Ok(None),
        Some(url) => match parse_endpoint(&url) {
            Ok(_) => Ok(Some(url)),
            Err(error) => Err(ConfigError::Url(key, error)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.pairs, vec![CurrencyPair::new("BTC", "USDT")]);
        assert_eq!(config.exchanges, vec![Exchange::Binance, Exchange::Okex]);
        assert_eq!(config.binance_url, None);
        assert_eq!(config.okex_url, None);
    }

    #[test]
    fn reads_lists_and_urls() {
        let config = config(&[
            (PAIRS, "btc/usdt, ETH/BTC,"),
            (EXCHANGES, "okex"),
            (OKEX_URL, "ws://localhost:8443/ws/v3"),
        ])
        .unwrap();

        assert_eq!(
            config.pairs,
            vec![CurrencyPair::new("BTC", "USDT"), CurrencyPair::new("ETH", "BTC")]
        );
        assert_eq!(config.exchanges, vec![Exchange::Okex]);
        assert_eq!(config.okex_url.as_deref(), Some("ws://localhost:8443/ws/v3"));
    }

    #[test_case(PAIRS, "BTCUSDT")]
    #[test_case(PAIRS, " , ")]
    #[test_case(EXCHANGES, "binance,kraken")]
    #[test_case(EXCHANGES, "")]
    #[test_case(BINANCE_URL, "https://stream.binance.com")]
    #[test_case(BINANCE_URL, "ws://")]
    #[test_case(OKEX_URL, "ws://[x")]
    fn rejects_invalid_values(key: &str, value: &str) {
        assert!(config(&[(key, value)]).is_err());
    }

    #[test]
    fn url_error_names_the_variable() {
        let error = config(&[(OKEX_URL, "ws://")]).unwrap_err();

        assert!(matches!(error, ConfigError::Url(OKEX_URL, ListenerError::InvalidUrl { .. })));
        assert!(error.to_string().starts_with("DL_OKEX_URL: invalid endpoint 'ws://'"));
    }
}
