pub mod binance;
pub mod executor;
pub mod lifecycle;
pub mod market;
pub mod service;

pub use binance::BinanceTickerSource;
pub use executor::TradeGateway;
pub use lifecycle::Scheduler;
pub use market::MarketDataStore;
pub use service::{CycleReport, TradingCore};
