use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    ensure_positive, AlertCondition, AlertTriggered, CoreEvent, Error, EventBus, MarketSnapshot,
    Result,
};

use crate::{AlertAction, PriceAlert};

struct AlertEntry {
    alert: PriceAlert,
    action: Option<Arc<dyn AlertAction>>,
}

/// Outcome of one `evaluate_all` pass.
#[derive(Debug, Default)]
pub struct AlertPass {
    pub triggered: Vec<AlertTriggered>,
    /// Alert actions that failed, keyed by alert id.
    pub failures: Vec<(String, Error)>,
}

/// Holds all price alerts in insertion order.
pub struct AlertRegistry {
    entries: RwLock<Vec<AlertEntry>>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a new active alert and return its id.
    pub async fn create(
        &self,
        instrument: &str,
        target_price: f64,
        condition: AlertCondition,
        action: Option<Arc<dyn AlertAction>>,
    ) -> Result<String> {
        if instrument.trim().is_empty() {
            return Err(Error::InvalidParameter("instrument must not be empty".into()));
        }
        ensure_positive("target price", target_price)?;

        let alert = PriceAlert {
            id: uuid::Uuid::new_v4().to_string(),
            instrument: instrument.trim().to_string(),
            target_price,
            condition,
            active: true,
            has_action: action.is_some(),
            created_at: Utc::now(),
            triggered_at: None,
        };
        let id = alert.id.clone();
        info!(
            id = %id,
            instrument = %alert.instrument,
            target = target_price,
            condition = %condition,
            "Price alert created"
        );
        self.entries.write().await.push(AlertEntry { alert, action });
        Ok(id)
    }

    pub async fn remove(&self, alert_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter().position(|e| e.alert.id == alert_id) {
            Some(idx) => {
                let removed = entries.remove(idx);
                info!(id = %removed.alert.id, instrument = %removed.alert.instrument, "Price alert removed");
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, alert_id: &str) -> Result<PriceAlert> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.alert.id == alert_id)
            .map(|e| e.alert.clone())
            .ok_or_else(|| Error::not_found("alert", alert_id))
    }

    async fn contains(&self, alert_id: &str) -> bool {
        self.entries.read().await.iter().any(|e| e.alert.id == alert_id)
    }

    pub async fn list(&self) -> Vec<PriceAlert> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.alert.clone())
            .collect()
    }

    /// Instruments watched by at least one active alert, first-seen order.
    pub async fn instruments(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in self.entries.read().await.iter().filter(|e| e.alert.active) {
            if !out.contains(&entry.alert.instrument) {
                out.push(entry.alert.instrument.clone());
            }
        }
        out
    }

    /// Check every active alert against `snapshots`.
    ///
    /// Triggered alerts are deactivated under the lock, then announced and
    /// their actions run in insertion order once the lock is released.
    pub async fn evaluate_all(
        &self,
        snapshots: &HashMap<String, MarketSnapshot>,
        events: &EventBus,
        now: DateTime<Utc>,
    ) -> AlertPass {
        let fired: Vec<(PriceAlert, Option<Arc<dyn AlertAction>>, f64)> = {
            let mut entries = self.entries.write().await;
            let mut fired = Vec::new();
            for entry in entries.iter_mut().filter(|e| e.alert.active) {
                let Some(snapshot) = snapshots.get(&entry.alert.instrument) else {
                    debug!(id = %entry.alert.id, instrument = %entry.alert.instrument, "No snapshot for alert");
                    continue;
                };
                if entry
                    .alert
                    .condition
                    .is_met(snapshot.price, entry.alert.target_price)
                {
                    entry.alert.active = false;
                    entry.alert.triggered_at = Some(now);
                    fired.push((entry.alert.clone(), entry.action.clone(), snapshot.price));
                }
            }
            fired
        };

        let mut pass = AlertPass::default();
        for (alert, action, current_price) in fired {
            // An earlier action in this pass may have removed it.
            if !self.contains(&alert.id).await {
                debug!(id = %alert.id, "Alert removed before it was announced");
                continue;
            }
            info!(
                id = %alert.id,
                instrument = %alert.instrument,
                price = current_price,
                target = alert.target_price,
                condition = %alert.condition,
                "Price alert triggered"
            );

            let payload = AlertTriggered {
                alert_id: alert.id.clone(),
                instrument: alert.instrument.clone(),
                current_price,
                target_price: alert.target_price,
                condition: alert.condition,
                triggered_at: now,
            };
            events.publish(CoreEvent::AlertTriggered(payload.clone())).await;
            pass.triggered.push(payload);

            if let Some(action) = action {
                if let Err(e) = action.on_trigger(&alert, current_price).await {
                    warn!(id = %alert.id, error = %e, "Alert action failed");
                    pass.failures.push((alert.id.clone(), e));
                }
            }
        }
        pass
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}
