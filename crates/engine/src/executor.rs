use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info};

use common::{
    parse_positive_decimal, Account, AccountProvider, CoreEvent, Error, EventBus, ExchangeClient,
    OrderGateway, OrderType, Result, TradeRecord, TradeRequest,
};

use crate::market::MarketDataStore;

/// Validates trade requests, prices them, and hands them to the exchange.
///
/// This is the ONLY component that calls `ExchangeClient::submit_order`.
/// Every accepted order is appended to the history and announced as a
/// `trade-executed` event.
pub struct TradeGateway {
    client: Arc<dyn ExchangeClient>,
    store: Arc<MarketDataStore>,
    events: EventBus,
    account: RwLock<Option<Account>>,
    history: RwLock<Vec<TradeRecord>>,
}

impl TradeGateway {
    pub fn new(client: Arc<dyn ExchangeClient>, store: Arc<MarketDataStore>, events: EventBus) -> Self {
        Self {
            client,
            store,
            events,
            account: RwLock::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    pub async fn initialize(&self, account: Account) {
        info!(address = %account.address, network = %account.network, "Trading account ready");
        *self.account.write().await = Some(account);
    }

    /// Create an account with `provider` and trade against it.
    pub async fn initialize_with(&self, provider: &dyn AccountProvider) -> Result<Account> {
        let account = provider.create_account().await?;
        self.initialize(account.clone()).await;
        Ok(account)
    }

    pub async fn account(&self) -> Option<Account> {
        self.account.read().await.clone()
    }

    /// Executed trades in submission order.
    pub async fn history(&self) -> Vec<TradeRecord> {
        self.history.read().await.clone()
    }

    async fn reference_price(&self, request: &TradeRequest) -> Result<f64> {
        match request.order_type {
            OrderType::Market => self.store.current_price(&request.product_id).await,
            OrderType::Limit => {
                let raw = request.limit_price.as_deref().ok_or_else(|| {
                    Error::InvalidParameter("limit orders require a limit price".into())
                })?;
                parse_positive_decimal("limit price", raw)
            }
        }
    }
}

#[async_trait]
impl OrderGateway for TradeGateway {
    async fn submit(&self, mut request: TradeRequest) -> Result<TradeRecord> {
        let account = self.account.read().await.clone().ok_or(Error::NotInitialized)?;
        if request.product_id.trim().is_empty() {
            return Err(Error::InvalidParameter("product id must not be empty".into()));
        }
        // Records and the venue see the amount that was validated.
        request.amount = request.amount.trim().to_string();
        if let Some(limit) = request.limit_price.as_mut() {
            *limit = limit.trim().to_string();
        }
        parse_positive_decimal("amount", &request.amount)?;
        let executed_price = self.reference_price(&request).await?;

        info!(
            pair = %request.product_id,
            side = %request.side,
            order_type = %request.order_type,
            amount = %request.amount,
            price = executed_price,
            "Submitting order"
        );

        let status = match self.client.submit_order(&account, &request, executed_price).await {
            Ok(status) => status,
            Err(e) => {
                error!(pair = %request.product_id, error = %e, "Order submission failed");
                return Err(e);
            }
        };

        let limit_price = match request.order_type {
            OrderType::Limit => request.limit_price,
            OrderType::Market => None,
        };
        let record = TradeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: request.product_id,
            order_type: request.order_type,
            side: request.side,
            amount: request.amount,
            limit_price,
            status,
            submitted_at: Utc::now(),
            executed_price,
        };

        info!(
            id = %record.id,
            pair = %record.product_id,
            side = %record.side,
            price = record.executed_price,
            status = %record.status,
            "Trade executed"
        );
        self.history.write().await.push(record.clone());
        self.events.publish(CoreEvent::TradeExecuted(record.clone())).await;
        Ok(record)
    }
}
