mod rest;

pub use rest::BinanceTickerSource;
