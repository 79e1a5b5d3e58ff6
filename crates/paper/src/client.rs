use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use common::{Account, ExchangeClient, OrderStatus, OrderType, Result, TradeRequest};

/// Simulated order venue for paper trading.
///
/// Market orders fill immediately at the gateway's reference price; limit
/// orders rest as open. No real orders are ever sent anywhere.
pub struct PaperClient {
    /// Every order accepted so far, in submission order.
    accepted: Arc<RwLock<Vec<TradeRequest>>>,
}

impl PaperClient {
    pub fn new() -> Self {
        Self {
            accepted: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn accepted_orders(&self) -> Vec<TradeRequest> {
        self.accepted.read().await.clone()
    }
}

impl Default for PaperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn submit_order(
        &self,
        account: &Account,
        request: &TradeRequest,
        reference_price: f64,
    ) -> Result<OrderStatus> {
        let status = match request.order_type {
            OrderType::Market => OrderStatus::Filled,
            OrderType::Limit => OrderStatus::Open,
        };

        debug!(
            account = %account.address,
            pair = %request.product_id,
            side = %request.side,
            order_type = %request.order_type,
            amount = %request.amount,
            price = reference_price,
            status = %status,
            "Paper order simulated"
        );

        self.accepted.write().await.push(request.clone());
        Ok(status)
    }
}
