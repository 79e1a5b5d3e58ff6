use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Account, MarketSnapshot, OrderSide, OrderStatus, Result, TradeRecord, TradeRequest};

/// Supplies market data for a set of instruments.
///
/// `SimulatedPriceSource` and `StaticPriceSource` in `crates/paper` stand in
/// for a real feed; `BinanceTickerSource` in `crates/engine` is the real one.
/// Instruments the source cannot price are simply left out of the result.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, instruments: &[String]) -> Result<HashMap<String, MarketSnapshot>>;
}

/// Abstraction over the order venue.
///
/// Only `TradeGateway` in `crates/engine` should hold a `dyn ExchangeClient`.
/// Everything else submits through an `OrderGateway`.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Hand an order to the venue. `reference_price` is the price the
    /// gateway stamped on the order.
    async fn submit_order(
        &self,
        account: &Account,
        request: &TradeRequest,
        reference_price: f64,
    ) -> Result<OrderStatus>;
}

/// Custody provider that creates the account trading runs against.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn create_account(&self) -> Result<Account>;
}

/// Entry point for anything that wants a trade executed: strategies, alert
/// actions, operator commands.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit(&self, request: TradeRequest) -> Result<TradeRecord>;

    async fn market_buy(&self, product_id: &str, amount: &str) -> Result<TradeRecord> {
        self.submit(TradeRequest::market(product_id, OrderSide::Buy, amount))
            .await
    }

    async fn market_sell(&self, product_id: &str, amount: &str) -> Result<TradeRecord> {
        self.submit(TradeRequest::market(product_id, OrderSide::Sell, amount))
            .await
    }

    async fn limit_buy(&self, product_id: &str, amount: &str, price: &str) -> Result<TradeRecord> {
        self.submit(TradeRequest::limit(product_id, OrderSide::Buy, amount, price))
            .await
    }

    async fn limit_sell(&self, product_id: &str, amount: &str, price: &str) -> Result<TradeRecord> {
        self.submit(TradeRequest::limit(product_id, OrderSide::Sell, amount, price))
            .await
    }
}
