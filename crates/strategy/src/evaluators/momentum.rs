use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ensure_positive, parse_positive_decimal, OrderSide, Result};

use crate::{Evaluator, Signal, SignalTrigger};

/// Follows the move since the previous cycle: buy after a rise of at least
/// `threshold_pct` percent, sell after an equal fall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumParams {
    pub threshold_pct: f64,
    pub trade_amount: String,
    #[serde(default)]
    pub last_price: Option<f64>,
}

impl MomentumParams {
    pub fn new(threshold_pct: f64, trade_amount: impl Into<String>) -> Self {
        Self {
            threshold_pct,
            trade_amount: trade_amount.into(),
            last_price: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("threshold_pct", self.threshold_pct)?;
        parse_positive_decimal("trade_amount", &self.trade_amount)?;
        Ok(())
    }
}

impl Evaluator for MomentumParams {
    fn evaluate(&mut self, price: f64, _now: DateTime<Utc>) -> Option<Signal> {
        let signal = self.last_price.and_then(|last| {
            let pct_change = (price - last) / last * 100.0;
            if pct_change.abs() < self.threshold_pct {
                return None;
            }
            let side = if pct_change > 0.0 {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            Some(Signal {
                side,
                amount: self.trade_amount.clone(),
                trigger: SignalTrigger::Momentum { pct_change },
            })
        });

        self.last_price = Some(price);
        signal
    }
}
