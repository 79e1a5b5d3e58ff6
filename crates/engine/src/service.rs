use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use alerts::{AlertAction, AlertRegistry, PriceAlert};
use common::{
    Account, AccountProvider, AlertCondition, AlertTriggered, Error, EventBus, ExchangeClient,
    MarketSnapshot, OrderGateway, PriceSource, Result, TradeRecord, TradeRequest,
};
use strategy::{Strategy, StrategyFileConfig, StrategyParams, StrategyRegistry};

use crate::executor::TradeGateway;
use crate::market::MarketDataStore;

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Instruments whose snapshot was updated.
    pub refreshed: usize,
    pub refresh_error: Option<Error>,
    pub alerts_triggered: Vec<AlertTriggered>,
    pub trades: Vec<TradeRecord>,
    /// Per-item failures: alert actions and strategies. None of them stop the cycle.
    pub failures: Vec<Error>,
}

/// Owns the trading state and runs refresh → alerts → strategies.
///
/// Cycles are serialised on an internal lock, whether they come from the
/// scheduler or a direct `run_cycle` call.
pub struct TradingCore {
    store: Arc<MarketDataStore>,
    alerts: AlertRegistry,
    strategies: StrategyRegistry,
    gateway: Arc<TradeGateway>,
    events: EventBus,
    price_source: Arc<dyn PriceSource>,
    watchlist: RwLock<Vec<String>>,
    cycle_lock: Mutex<()>,
}

impl TradingCore {
    pub fn new(
        price_source: Arc<dyn PriceSource>,
        client: Arc<dyn ExchangeClient>,
        watchlist: Vec<String>,
    ) -> Self {
        let store = Arc::new(MarketDataStore::new());
        let events = EventBus::new();
        let gateway = Arc::new(TradeGateway::new(client, store.clone(), events.clone()));
        Self {
            store,
            alerts: AlertRegistry::new(),
            strategies: StrategyRegistry::new(),
            gateway,
            events,
            price_source,
            watchlist: RwLock::new(watchlist),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &MarketDataStore {
        &self.store
    }

    pub fn alerts(&self) -> &AlertRegistry {
        &self.alerts
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Shared handle for alert actions that trade.
    pub fn gateway(&self) -> Arc<TradeGateway> {
        self.gateway.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn initialize(&self, provider: &dyn AccountProvider) -> Result<Account> {
        self.gateway.initialize_with(provider).await
    }

    // ─── Market data ──────────────────────────────────────────────────────────

    pub async fn snapshot(&self, instrument: &str) -> Option<MarketSnapshot> {
        self.store.get(instrument).await
    }

    pub async fn current_price(&self, instrument: &str) -> Result<f64> {
        self.store.current_price(instrument).await
    }

    pub async fn watch(&self, instrument: &str) {
        let mut watchlist = self.watchlist.write().await;
        if !watchlist.iter().any(|i| i == instrument) {
            watchlist.push(instrument.to_string());
        }
    }

    pub async fn watchlist(&self) -> Vec<String> {
        self.watchlist.read().await.clone()
    }

    // ─── Alerts ───────────────────────────────────────────────────────────────

    pub async fn create_alert(
        &self,
        instrument: &str,
        target_price: f64,
        condition: AlertCondition,
        action: Option<Arc<dyn AlertAction>>,
    ) -> Result<String> {
        self.alerts.create(instrument, target_price, condition, action).await
    }

    pub async fn remove_alert(&self, alert_id: &str) -> bool {
        self.alerts.remove(alert_id).await
    }

    pub async fn list_alerts(&self) -> Vec<PriceAlert> {
        self.alerts.list().await
    }

    // ─── Strategies ───────────────────────────────────────────────────────────

    pub async fn create_strategy(
        &self,
        name: &str,
        instrument: &str,
        params: StrategyParams,
        enabled: bool,
    ) -> Result<String> {
        self.strategies.create(name, instrument, params, enabled).await
    }

    pub async fn enable_strategy(&self, id: &str) -> bool {
        self.strategies.enable(id).await
    }

    pub async fn disable_strategy(&self, id: &str) -> bool {
        self.strategies.disable(id).await
    }

    pub async fn list_strategies(&self) -> Vec<Strategy> {
        self.strategies.list().await
    }

    /// Register every strategy and alert from a strategy file.
    ///
    /// Stops at the first invalid entry; entries before it stay registered.
    pub async fn load_file_config(&self, config: &StrategyFileConfig) -> Result<()> {
        for entry in &config.strategies {
            self.strategies
                .create(&entry.name, &entry.pair, entry.params.clone(), entry.enabled)
                .await?;
        }
        for alert in &config.alerts {
            self.alerts
                .create(&alert.pair, alert.target_price, alert.condition, None)
                .await?;
        }
        info!(
            strategies = config.strategies.len(),
            alerts = config.alerts.len(),
            "Strategy file loaded"
        );
        Ok(())
    }

    // ─── Trading ──────────────────────────────────────────────────────────────

    pub async fn submit(&self, request: TradeRequest) -> Result<TradeRecord> {
        self.gateway.submit(request).await
    }

    pub async fn trade_history(&self) -> Vec<TradeRecord> {
        self.gateway.history().await
    }

    // ─── Cycle ────────────────────────────────────────────────────────────────

    /// Watchlist, then active alert instruments, then enabled strategy instruments.
    pub async fn instruments_to_refresh(&self) -> Vec<String> {
        let mut out = self.watchlist.read().await.clone();
        let extra = self
            .alerts
            .instruments()
            .await
            .into_iter()
            .chain(self.strategies.instruments().await);
        for instrument in extra {
            if !out.contains(&instrument) {
                out.push(instrument);
            }
        }
        out
    }

    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// One full cycle with `now` as the evaluation time.
    ///
    /// A failed refresh is logged and the cycle goes on with the previous
    /// snapshots. Alerts and strategies read the same frozen snapshot map.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let mut report = CycleReport::default();

        let instruments = self.instruments_to_refresh().await;
        match self.store.refresh(self.price_source.as_ref(), &instruments).await {
            Ok(n) => report.refreshed = n,
            Err(e) => {
                warn!(error = %e, "Market refresh failed, using previous snapshots");
                report.refresh_error = Some(e);
            }
        }
        let snapshots = self.store.snapshot_all().await;

        let alert_pass = self.alerts.evaluate_all(&snapshots, &self.events, now).await;
        report.alerts_triggered = alert_pass.triggered;
        report
            .failures
            .extend(alert_pass.failures.into_iter().map(|(_, e)| e));

        let strategy_pass = self
            .strategies
            .evaluate_all(&snapshots, self.gateway.as_ref(), now)
            .await;
        report.trades = strategy_pass.trades;
        report.failures.extend(strategy_pass.failures);

        debug!(
            refreshed = report.refreshed,
            alerts = report.alerts_triggered.len(),
            trades = report.trades.len(),
            failures = report.failures.len(),
            "Cycle complete"
        );
        report
    }
}
