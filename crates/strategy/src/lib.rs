pub mod config;
pub mod evaluators;
pub mod indicators;
pub mod params;
pub mod registry;

pub use config::{AlertConfig, StrategyConfig, StrategyFileConfig};
pub use evaluators::{DcaParams, GridParams, MeanReversionParams, MomentumParams};
pub use params::StrategyParams;
pub use registry::{StrategyPass, StrategyRegistry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::OrderSide;

/// A registered strategy. `params` carries both the configuration and the
/// evaluator's private state, which is updated in place every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    /// Human-readable name shown in logs and chat.
    pub name: String,
    pub instrument: String,
    pub enabled: bool,
    pub params: StrategyParams,
    pub created_at: DateTime<Utc>,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        self.params.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Dca,
    Grid,
    Momentum,
    MeanReversion,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Dca => write!(f, "dca"),
            StrategyKind::Grid => write!(f, "grid"),
            StrategyKind::Momentum => write!(f, "momentum"),
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
        }
    }
}

/// A trade an evaluator wants placed on its strategy's instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub side: OrderSide,
    pub amount: String,
    pub trigger: SignalTrigger,
}

/// Why an evaluator fired.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalTrigger {
    /// DCA interval elapsed.
    Schedule,
    GridLevel { level: usize, line_price: f64 },
    Momentum { pct_change: f64 },
    MeanReversion { z_score: f64 },
}

impl std::fmt::Display for SignalTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalTrigger::Schedule => write!(f, "dca interval elapsed"),
            SignalTrigger::GridLevel { level, line_price } => {
                write!(f, "grid level {level} hit at {line_price:.2}")
            }
            SignalTrigger::Momentum { pct_change } => write!(f, "momentum {pct_change:+.2}%"),
            SignalTrigger::MeanReversion { z_score } => write!(f, "z-score {z_score:.2}"),
        }
    }
}

/// Implemented by each strategy kind's params/state struct.
pub trait Evaluator {
    /// Inspect the latest price, update private state, and optionally emit a signal.
    fn evaluate(&mut self, price: f64, now: DateTime<Utc>) -> Option<Signal>;

    /// Called once the signal's order has been accepted by the gateway.
    fn record_fill(&mut self, _signal: &Signal, _now: DateTime<Utc>) {}
}
