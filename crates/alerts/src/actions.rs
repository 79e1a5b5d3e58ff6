use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use common::{parse_positive_decimal, OrderGateway, OrderSide, Result, TradeRequest};

use crate::{AlertAction, PriceAlert};

/// Places a market order on the alert's instrument when it fires.
pub struct TradeOnTrigger {
    gateway: Arc<dyn OrderGateway>,
    side: OrderSide,
    amount: String,
}

impl TradeOnTrigger {
    pub fn new(gateway: Arc<dyn OrderGateway>, side: OrderSide, amount: impl Into<String>) -> Result<Self> {
        let amount = amount.into();
        parse_positive_decimal("amount", &amount)?;
        Ok(Self { gateway, side, amount })
    }
}

#[async_trait]
impl AlertAction for TradeOnTrigger {
    async fn on_trigger(&self, alert: &PriceAlert, current_price: f64) -> Result<()> {
        let record = self
            .gateway
            .submit(TradeRequest::market(&alert.instrument, self.side, &self.amount))
            .await?;
        info!(
            alert_id = %alert.id,
            trade_id = %record.id,
            side = %self.side,
            amount = %self.amount,
            price = current_price,
            "Alert order placed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AlertCondition, Error, OrderStatus, TradeRecord};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        requests: Mutex<Vec<TradeRequest>>,
    }

    #[async_trait]
    impl OrderGateway for RecordingGateway {
        async fn submit(&self, request: TradeRequest) -> Result<TradeRecord> {
            self.requests.lock().await.push(request.clone());
            Ok(TradeRecord {
                id: "t1".into(),
                product_id: request.product_id,
                order_type: request.order_type,
                side: request.side,
                amount: request.amount,
                limit_price: request.limit_price,
                status: OrderStatus::Filled,
                submitted_at: Utc::now(),
                executed_price: 100.0,
            })
        }
    }

    fn alert() -> PriceAlert {
        PriceAlert {
            id: "a1".into(),
            instrument: "ETH-USD".into(),
            target_price: 2000.0,
            condition: AlertCondition::Below,
            active: false,
            has_action: true,
            created_at: Utc::now(),
            triggered_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn submits_market_order_on_alert_instrument() {
        let gateway = Arc::new(RecordingGateway::default());
        let action = TradeOnTrigger::new(gateway.clone(), OrderSide::Buy, "0.5").unwrap();

        action.on_trigger(&alert(), 1999.0).await.unwrap();

        let requests = gateway.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], TradeRequest::market("ETH-USD", OrderSide::Buy, "0.5"));
    }

    #[test]
    fn rejects_malformed_amount() {
        let gateway = Arc::new(RecordingGateway::default());
        let err = TradeOnTrigger::new(gateway, OrderSide::Sell, "lots").err().unwrap();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
