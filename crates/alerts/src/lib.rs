pub mod actions;
pub mod registry;

pub use actions::TradeOnTrigger;
pub use registry::{AlertPass, AlertRegistry};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{AlertCondition, Result};

/// A one-shot price alert.
///
/// Created active, flipped to inactive the moment it triggers, and never
/// re-armed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: String,
    pub instrument: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub active: bool,
    /// True when an `AlertAction` runs on trigger.
    pub has_action: bool,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Work to run when an alert fires, e.g. placing an order.
///
/// Failures are logged by the registry and never stop the rest of the pass.
#[async_trait]
pub trait AlertAction: Send + Sync {
    async fn on_trigger(&self, alert: &PriceAlert, current_price: f64) -> Result<()>;
}
