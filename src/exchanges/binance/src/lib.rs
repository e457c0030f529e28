mod listener;

pub use listener::{BinanceConfig, BinanceListener, URL};
