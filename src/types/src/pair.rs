use crate::{ListenerError, PairParseError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DELIMITER: char = '/';

/// Exchange agnostic pair, always upper case, written as `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> CurrencyPair {
        CurrencyPair {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once(DELIMITER)
            .ok_or_else(|| PairParseError(s.to_string()))?;

        let valid = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(PairParseError(s.to_string()));
        }

        Ok(CurrencyPair::new(base, quote))
    }
}

/// Bidirectional mapping between the configured pairs and an exchange's wire symbols.
/// Two distinct pairs may not share a symbol.
#[derive(Debug, Clone, Default)]
pub struct PairSymbols {
    by_symbol: HashMap<String, CurrencyPair>,
}

impl PairSymbols {
    pub fn new<F: Fn(&CurrencyPair) -> String>(
        pairs: &[CurrencyPair],
        encode: F,
    ) -> Result<PairSymbols, ListenerError> {
        let mut symbols = PairSymbols::default();
        for pair in pairs {
            match symbols.by_symbol.entry(encode(pair)) {
                Entry::Vacant(entry) => {
                    entry.insert(pair.clone());
                }
                Entry::Occupied(entry) if entry.get() == pair => {}
                Entry::Occupied(entry) => {
                    return Err(ListenerError::SymbolCollision {
                        symbol: entry.key().clone(),
                        first: entry.get().clone(),
                        second: pair.clone(),
                    })
                }
            }
        }
        Ok(symbols)
    }

    pub fn pair(&self, symbol: &str) -> Option<&CurrencyPair> {
        self.by_symbol.get(symbol)
    }

    /// Wire symbols in a stable order, so subscriptions are deterministic.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<_> = self.by_symbol.keys().map(|s| s.as_str()).collect();
        symbols.sort_unstable();
        symbols
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
