use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Error, Result};

use crate::evaluators::{DcaParams, GridParams, MeanReversionParams, MomentumParams};
use crate::{Evaluator, Signal, StrategyKind};

/// Per-kind configuration and evaluator state.
///
/// In TOML the variant is chosen by the `type` key:
/// ```toml
/// type = "grid"
/// lower_price = 2000.0
/// upper_price = 3000.0
/// grid_levels = 10
/// amount_per_grid = "0.05"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    Dca(DcaParams),
    Grid(GridParams),
    Momentum(MomentumParams),
    MeanReversion(MeanReversionParams),
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::Dca(_) => StrategyKind::Dca,
            StrategyParams::Grid(_) => StrategyKind::Grid,
            StrategyParams::Momentum(_) => StrategyKind::Momentum,
            StrategyParams::MeanReversion(_) => StrategyKind::MeanReversion,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyParams::Dca(p) => p.validate(),
            StrategyParams::Grid(p) => p.validate(),
            StrategyParams::Momentum(p) => p.validate(),
            StrategyParams::MeanReversion(p) => p.validate(),
        }
    }

    /// Run this kind's evaluator against the latest price.
    /// A price that is not finite and positive is an error, not a signal.
    pub fn evaluate(&mut self, price: f64, now: DateTime<Utc>) -> Result<Option<Signal>> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "market price must be finite and positive, got {price}"
            )));
        }
        Ok(self.evaluator().evaluate(price, now))
    }

    pub fn record_fill(&mut self, signal: &Signal, now: DateTime<Utc>) {
        self.evaluator().record_fill(signal, now);
    }

    fn evaluator(&mut self) -> &mut dyn Evaluator {
        match self {
            StrategyParams::Dca(p) => p,
            StrategyParams::Grid(p) => p,
            StrategyParams::Momentum(p) => p,
            StrategyParams::MeanReversion(p) => p,
        }
    }
}
