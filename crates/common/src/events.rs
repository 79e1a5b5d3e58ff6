use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::{AlertCondition, TradeRecord};

/// Payload of an `alert-triggered` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTriggered {
    pub alert_id: String,
    pub instrument: String,
    pub current_price: f64,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub triggered_at: DateTime<Utc>,
}

/// Everything the core announces to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum CoreEvent {
    AlertTriggered(AlertTriggered),
    TradeExecuted(TradeRecord),
}

impl CoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CoreEvent::AlertTriggered(_) => EventKind::AlertTriggered,
            CoreEvent::TradeExecuted(_) => EventKind::TradeExecuted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    AlertTriggered,
    TradeExecuted,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::AlertTriggered => write!(f, "alert-triggered"),
            EventKind::TradeExecuted => write!(f, "trade-executed"),
        }
    }
}

type Handler = Arc<dyn Fn(&CoreEvent) + Send + Sync>;

/// Typed publish/subscribe hub for core events.
///
/// Handlers registered with `subscribe` run inline on the publishing task, in
/// registration order. Async consumers (Telegram, dashboards) take a
/// broadcast receiver from `subscribe_stream` instead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
    handlers: Arc<RwLock<Vec<(EventKind, Handler)>>>,
}

impl EventBus {
    const CHANNEL_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self {
            tx,
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a handler for one event kind.
    pub async fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&CoreEvent) + Send + Sync + 'static,
    {
        self.handlers.write().await.push((kind, Arc::new(handler)));
    }

    pub fn subscribe_stream(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub async fn publish(&self, event: CoreEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .await
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();

        for handler in handlers {
            handler(&event);
        }

        // No stream subscribers is not an error.
        if self.tx.send(event).is_err() {
            debug!(%kind, "No stream subscribers for event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alert_event() -> CoreEvent {
        CoreEvent::AlertTriggered(AlertTriggered {
            alert_id: "a1".into(),
            instrument: "BTC-USD".into(),
            current_price: 45_500.0,
            target_price: 45_000.0,
            condition: AlertCondition::Above,
            triggered_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn handlers_only_see_their_kind() {
        let bus = EventBus::new();
        let alerts = Arc::new(AtomicUsize::new(0));
        let trades = Arc::new(AtomicUsize::new(0));

        let a = alerts.clone();
        bus.subscribe(EventKind::AlertTriggered, move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        let t = trades.clone();
        bus.subscribe(EventKind::TradeExecuted, move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        bus.publish(alert_event()).await;

        assert_eq!(alerts.load(Ordering::SeqCst), 1);
        assert_eq!(trades.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stream_subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_stream();

        bus.publish(alert_event()).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::AlertTriggered);
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let bus = EventBus::new();
        bus.publish(alert_event()).await;
    }

    #[test]
    fn event_kinds_render_as_kebab_case() {
        assert_eq!(EventKind::AlertTriggered.to_string(), "alert-triggered");
        assert_eq!(EventKind::TradeExecuted.to_string(), "trade-executed");
    }
}
