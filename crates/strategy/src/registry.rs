use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{Error, MarketSnapshot, OrderGateway, Result, TradeRecord, TradeRequest};

use crate::{Signal, Strategy, StrategyParams};

/// Outcome of one `evaluate_all` pass.
#[derive(Debug, Default)]
pub struct StrategyPass {
    pub trades: Vec<TradeRecord>,
    /// `EvaluatorFailure`s, one per strategy that failed this pass.
    pub failures: Vec<Error>,
}

/// Holds all strategies in insertion order and runs the enabled ones each cycle.
pub struct StrategyRegistry {
    strategies: RwLock<Vec<Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
        }
    }

    /// Register a strategy and return its id.
    pub async fn create(
        &self,
        name: &str,
        instrument: &str,
        params: StrategyParams,
        enabled: bool,
    ) -> Result<String> {
        let strategy = build_strategy(name, instrument, params, enabled)?;
        let id = strategy.id.clone();
        info!(
            id = %id,
            name = %strategy.name,
            kind = %strategy.kind(),
            pair = %strategy.instrument,
            enabled,
            "Registered strategy"
        );
        self.strategies.write().await.push(strategy);
        Ok(id)
    }

    pub async fn enable(&self, id: &str) -> bool {
        self.set_enabled(id, true).await
    }

    pub async fn disable(&self, id: &str) -> bool {
        self.set_enabled(id, false).await
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut strategies = self.strategies.write().await;
        match strategies.iter_mut().find(|s| s.id == id) {
            Some(strategy) => {
                if strategy.enabled != enabled {
                    info!(id = %id, name = %strategy.name, enabled, "Strategy toggled");
                }
                strategy.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Strategy> {
        self.strategies
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("strategy", id))
    }

    /// Explicit removal by the caller. Strategies are never removed automatically.
    pub async fn remove(&self, id: &str) -> bool {
        let mut strategies = self.strategies.write().await;
        match strategies.iter().position(|s| s.id == id) {
            Some(idx) => {
                let removed = strategies.remove(idx);
                info!(id = %removed.id, name = %removed.name, "Strategy removed");
                true
            }
            None => false,
        }
    }

    pub async fn list(&self) -> Vec<Strategy> {
        self.strategies.read().await.clone()
    }

    /// Instruments traded by enabled strategies, first-seen order.
    pub async fn instruments(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for strategy in self.strategies.read().await.iter().filter(|s| s.enabled) {
            if !out.contains(&strategy.instrument) {
                out.push(strategy.instrument.clone());
            }
        }
        out
    }

    /// Evaluate every enabled strategy in insertion order.
    ///
    /// The enabled check and the evaluator's state update happen under one
    /// write lock, so a concurrent toggle lands entirely before or after a
    /// strategy's evaluation. The lock is released while the order is
    /// submitted. A failing strategy is logged and skipped.
    pub async fn evaluate_all(
        &self,
        snapshots: &HashMap<String, MarketSnapshot>,
        gateway: &dyn OrderGateway,
        now: DateTime<Utc>,
    ) -> StrategyPass {
        let ids: Vec<String> = self
            .strategies
            .read()
            .await
            .iter()
            .map(|s| s.id.clone())
            .collect();

        let mut pass = StrategyPass::default();
        for id in ids {
            let outcome = {
                let mut strategies = self.strategies.write().await;
                // Removed since the pass started.
                let Some(strategy) = strategies.iter_mut().find(|s| s.id == id) else {
                    continue;
                };
                if !strategy.enabled {
                    continue;
                }
                let Some(snapshot) = snapshots.get(&strategy.instrument) else {
                    debug!(id = %id, pair = %strategy.instrument, "No snapshot for strategy");
                    continue;
                };
                strategy
                    .params
                    .evaluate(snapshot.price, now)
                    .map(|signal| signal.map(|s| (strategy.instrument.clone(), strategy.name.clone(), s)))
            };

            let (instrument, name, signal) = match outcome {
                Ok(Some(fired)) => fired,
                Ok(None) => continue,
                Err(e) => {
                    pass.failures.push(self.failure(&id, e));
                    continue;
                }
            };

            info!(
                id = %id,
                name = %name,
                pair = %instrument,
                side = %signal.side,
                amount = %signal.amount,
                trigger = %signal.trigger,
                "Strategy signal"
            );

            match gateway
                .submit(TradeRequest::market(&instrument, signal.side, &signal.amount))
                .await
            {
                Ok(record) => {
                    self.record_fill(&id, &signal, now).await;
                    pass.trades.push(record);
                }
                Err(e) => pass.failures.push(self.failure(&id, e)),
            }
        }
        pass
    }

    async fn record_fill(&self, id: &str, signal: &Signal, now: DateTime<Utc>) {
        let mut strategies = self.strategies.write().await;
        if let Some(strategy) = strategies.iter_mut().find(|s| s.id == id) {
            strategy.params.record_fill(signal, now);
        }
    }

    fn failure(&self, id: &str, cause: Error) -> Error {
        warn!(id = %id, error = %cause, "Strategy evaluation failed");
        Error::EvaluatorFailure {
            strategy_id: id.to_string(),
            reason: cause.to_string(),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn build_strategy(name: &str, instrument: &str, params: StrategyParams, enabled: bool) -> Result<Strategy> {
    if instrument.trim().is_empty() {
        return Err(Error::InvalidParameter("instrument must not be empty".into()));
    }
    params.validate()?;
    let name = match name.trim() {
        "" => format!("{} {}", params.kind(), instrument.trim()),
        n => n.to_string(),
    };
    Ok(Strategy {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        instrument: instrument.trim().to_string(),
        enabled,
        params,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::{DcaParams, GridParams, MeanReversionParams, MomentumParams};
    use crate::StrategyKind;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use common::{OrderSide, OrderStatus};
    use tokio::sync::Mutex;

    /// Fills every order at a fixed price; can be told to reject one instrument.
    #[derive(Default)]
    struct MockGateway {
        submitted: Mutex<Vec<TradeRequest>>,
        reject_pair: Option<String>,
    }

    #[async_trait]
    impl OrderGateway for MockGateway {
        async fn submit(&self, request: TradeRequest) -> Result<TradeRecord> {
            if self.reject_pair.as_deref() == Some(request.product_id.as_str()) {
                return Err(Error::Exchange("rejected".into()));
            }
            self.submitted.lock().await.push(request.clone());
            Ok(TradeRecord {
                id: uuid::Uuid::new_v4().to_string(),
                product_id: request.product_id,
                order_type: request.order_type,
                side: request.side,
                amount: request.amount,
                limit_price: request.limit_price,
                status: OrderStatus::Filled,
                submitted_at: Utc::now(),
                executed_price: 1.0,
            })
        }
    }

    fn snapshots(pairs: &[(&str, f64)]) -> HashMap<String, MarketSnapshot> {
        pairs
            .iter()
            .map(|(i, p)| (i.to_string(), MarketSnapshot::new(*i, *p)))
            .collect()
    }

    fn dca(amount: &str, minutes: u64) -> StrategyParams {
        StrategyParams::Dca(DcaParams::new(amount, minutes))
    }

    #[tokio::test]
    async fn toggle_round_trip_keeps_id_and_params() {
        let registry = StrategyRegistry::new();
        let params = StrategyParams::Grid(GridParams::new(2000.0, 3000.0, 10, "0.1"));
        let id = registry.create("eth grid", "ETH-USD", params.clone(), true).await.unwrap();

        assert!(registry.disable(&id).await);
        assert!(registry.enable(&id).await);

        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert!(listed[0].enabled);
        assert_eq!(listed[0].params, params);
    }

    #[tokio::test]
    async fn toggles_are_idempotent_and_report_unknown_ids() {
        let registry = StrategyRegistry::new();
        let id = registry.create("", "BTC-USD", dca("10", 60), false).await.unwrap();

        assert!(registry.disable(&id).await);
        assert!(registry.disable(&id).await);
        assert!(!registry.get(&id).await.unwrap().enabled);
        assert!(!registry.enable("missing").await);
        assert!(!registry.disable("missing").await);
    }

    #[tokio::test]
    async fn blank_name_gets_default() {
        let registry = StrategyRegistry::new();
        let id = registry.create("  ", "BTC-USD", dca("10", 60), true).await.unwrap();
        assert_eq!(registry.get(&id).await.unwrap().name, "dca BTC-USD");
    }

    #[tokio::test]
    async fn invalid_params_are_rejected() {
        let registry = StrategyRegistry::new();
        let err = registry
            .create("bad", "BTC-USD", dca("0", 60), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        let err = registry.create("bad", " ", dca("1", 60), true).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn dca_buys_configured_amount_and_respects_interval() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        let id = registry.create("dca", "BTC-USD", dca("0.002", 30), true).await.unwrap();
        let snaps = snapshots(&[("BTC-USD", 50_000.0)]);
        let start = Utc::now();

        let pass = registry.evaluate_all(&snaps, &gateway, start).await;
        assert_eq!(pass.trades.len(), 1);
        assert_eq!(pass.trades[0].amount, "0.002");
        assert_eq!(pass.trades[0].side, OrderSide::Buy);

        let pass = registry
            .evaluate_all(&snaps, &gateway, start + TimeDelta::minutes(10))
            .await;
        assert!(pass.trades.is_empty());

        let pass = registry
            .evaluate_all(&snaps, &gateway, start + TimeDelta::minutes(30))
            .await;
        assert_eq!(pass.trades.len(), 1);

        match registry.get(&id).await.unwrap().params {
            StrategyParams::Dca(p) => assert_eq!(p.last_execution, Some(start + TimeDelta::minutes(30))),
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_strategies_are_skipped() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        registry.create("dca", "BTC-USD", dca("1", 30), false).await.unwrap();

        let pass = registry
            .evaluate_all(&snapshots(&[("BTC-USD", 100.0)]), &gateway, Utc::now())
            .await;
        assert!(pass.trades.is_empty());
        assert!(gateway.submitted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_is_not_a_failure() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        registry.create("dca", "SOL-USD", dca("1", 30), true).await.unwrap();

        let pass = registry
            .evaluate_all(&snapshots(&[("BTC-USD", 100.0)]), &gateway, Utc::now())
            .await;
        assert!(pass.trades.is_empty());
        assert!(pass.failures.is_empty());
    }

    #[tokio::test]
    async fn failing_strategy_does_not_halt_the_pass() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway {
            reject_pair: Some("BTC-USD".into()),
            ..MockGateway::default()
        };
        let bad = registry.create("bad", "BTC-USD", dca("1", 30), true).await.unwrap();
        registry.create("good", "ETH-USD", dca("2", 30), true).await.unwrap();

        let pass = registry
            .evaluate_all(
                &snapshots(&[("BTC-USD", 100.0), ("ETH-USD", 10.0)]),
                &gateway,
                Utc::now(),
            )
            .await;

        assert_eq!(pass.trades.len(), 1);
        assert_eq!(pass.trades[0].product_id, "ETH-USD");
        assert_eq!(pass.failures.len(), 1);
        assert!(matches!(
            &pass.failures[0],
            Error::EvaluatorFailure { strategy_id, .. } if *strategy_id == bad
        ));

        // The rejected DCA was not marked executed, so it retries next cycle.
        match registry.get(&bad).await.unwrap().params {
            StrategyParams::Dca(p) => assert!(p.last_execution.is_none()),
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[tokio::test]
    async fn strategies_run_in_insertion_order() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        registry.create("a", "ETH-USD", dca("1", 30), true).await.unwrap();
        registry.create("b", "BTC-USD", dca("2", 30), true).await.unwrap();

        registry
            .evaluate_all(
                &snapshots(&[("BTC-USD", 100.0), ("ETH-USD", 10.0)]),
                &gateway,
                Utc::now(),
            )
            .await;

        let pairs: Vec<String> = gateway
            .submitted
            .lock()
            .await
            .iter()
            .map(|r| r.product_id.clone())
            .collect();
        assert_eq!(pairs, vec!["ETH-USD", "BTC-USD"]);
    }

    #[tokio::test]
    async fn grid_hit_is_submitted_once_per_entry() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        registry
            .create(
                "grid",
                "ETH-USD",
                StrategyParams::Grid(GridParams::new(2000.0, 3000.0, 10, "0.1")),
                true,
            )
            .await
            .unwrap();

        let near_line = snapshots(&[("ETH-USD", 2503.0)]);
        let first = registry.evaluate_all(&near_line, &gateway, Utc::now()).await;
        let second = registry.evaluate_all(&near_line, &gateway, Utc::now()).await;

        assert_eq!(first.trades.len(), 1);
        assert!(second.trades.is_empty());
    }

    #[tokio::test]
    async fn momentum_and_mean_reversion_keep_state_between_passes() {
        let registry = StrategyRegistry::new();
        let gateway = MockGateway::default();
        let mom = registry
            .create(
                "mom",
                "BTC-USD",
                StrategyParams::Momentum(MomentumParams::new(2.0, "0.01")),
                true,
            )
            .await
            .unwrap();
        let mr = registry
            .create(
                "mr",
                "BTC-USD",
                StrategyParams::MeanReversion(MeanReversionParams::new(3, 1.0, "0.01")),
                true,
            )
            .await
            .unwrap();

        for price in [100.0, 101.0, 105.0] {
            registry
                .evaluate_all(&snapshots(&[("BTC-USD", price)]), &gateway, Utc::now())
                .await;
        }

        match registry.get(&mom).await.unwrap().params {
            StrategyParams::Momentum(p) => assert_eq!(p.last_price, Some(105.0)),
            other => panic!("unexpected params {other:?}"),
        }
        let mr = registry.get(&mr).await.unwrap();
        assert_eq!(mr.kind(), StrategyKind::MeanReversion);
        match mr.params {
            StrategyParams::MeanReversion(p) => assert_eq!(p.price_history.len(), 3),
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[tokio::test]
    async fn instruments_cover_enabled_strategies() {
        let registry = StrategyRegistry::new();
        registry.create("a", "ETH-USD", dca("1", 30), true).await.unwrap();
        registry.create("b", "ETH-USD", dca("1", 30), true).await.unwrap();
        registry.create("c", "SOL-USD", dca("1", 30), false).await.unwrap();

        assert_eq!(registry.instruments().await, vec!["ETH-USD".to_string()]);
    }

    #[tokio::test]
    async fn remove_is_explicit() {
        let registry = StrategyRegistry::new();
        let id = registry.create("a", "ETH-USD", dca("1", 30), true).await.unwrap();
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(matches!(registry.get(&id).await.unwrap_err(), Error::NotFound { .. }));
    }

    /// Parks inside `submit` until released.
    #[derive(Default)]
    struct ParkedGateway {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        submits: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl OrderGateway for ParkedGateway {
        async fn submit(&self, request: TradeRequest) -> Result<TradeRecord> {
            self.submits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(TradeRecord {
                id: "parked".into(),
                product_id: request.product_id,
                order_type: request.order_type,
                side: request.side,
                amount: request.amount,
                limit_price: request.limit_price,
                status: OrderStatus::Filled,
                submitted_at: Utc::now(),
                executed_price: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn disable_during_submit_lands_after_the_evaluation() {
        use std::sync::atomic::Ordering;
        use std::sync::Arc;
        use std::time::Duration;

        let registry = Arc::new(StrategyRegistry::new());
        let gateway = Arc::new(ParkedGateway::default());
        let id = registry.create("dca", "BTC-USD", dca("1", 60), true).await.unwrap();
        let now = Utc::now();

        let pass = tokio::spawn({
            let registry = registry.clone();
            let gateway = gateway.clone();
            async move {
                let snaps = snapshots(&[("BTC-USD", 50_000.0)]);
                registry.evaluate_all(&snaps, gateway.as_ref(), now).await
            }
        });

        gateway.entered.notified().await;
        // The registry lock is not held across the submit.
        let disabled = tokio::time::timeout(Duration::from_secs(2), registry.disable(&id))
            .await
            .expect("disable waited on the in-flight submit");
        assert!(disabled);

        gateway.release.notify_one();
        let pass = pass.await.unwrap();
        assert_eq!(pass.trades.len(), 1);

        let strategy = registry.get(&id).await.unwrap();
        assert!(!strategy.enabled);
        match &strategy.params {
            StrategyParams::Dca(p) => assert_eq!(p.last_execution, Some(now)),
            other => panic!("unexpected params {other:?}"),
        }

        // Due again two hours later, but disabled: never evaluated.
        let later = now + TimeDelta::try_hours(2).unwrap();
        let snaps = snapshots(&[("BTC-USD", 50_000.0)]);
        let next = tokio::time::timeout(
            Duration::from_secs(2),
            registry.evaluate_all(&snaps, gateway.as_ref(), later),
        )
        .await
        .expect("disabled strategy reached the gateway");
        assert!(next.trades.is_empty());
        assert_eq!(gateway.submits.load(Ordering::SeqCst), 1);
        match registry.get(&id).await.unwrap().params {
            StrategyParams::Dca(p) => assert_eq!(p.last_execution, Some(now)),
            other => panic!("unexpected params {other:?}"),
        }
    }
}
