use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ensure_positive, parse_positive_decimal, Error, OrderSide, Result};

use crate::indicators::z_score;
use crate::{Evaluator, Signal, SignalTrigger};

/// Trades against stretched prices: buy when the z-score over the last
/// `lookback_period` prices drops to `-threshold`, sell at `+threshold`.
/// No signal until the window is full, and none on a flat window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionParams {
    pub lookback_period: usize,
    pub threshold: f64,
    pub trade_amount: String,
    #[serde(default)]
    pub price_history: VecDeque<f64>,
}

impl MeanReversionParams {
    pub fn new(lookback_period: usize, threshold: f64, trade_amount: impl Into<String>) -> Self {
        Self {
            lookback_period,
            threshold,
            trade_amount: trade_amount.into(),
            price_history: VecDeque::with_capacity(lookback_period),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback_period < 2 {
            return Err(Error::InvalidParameter(
                "lookback_period must be at least 2".into(),
            ));
        }
        ensure_positive("threshold", self.threshold)?;
        parse_positive_decimal("trade_amount", &self.trade_amount)?;
        Ok(())
    }
}

impl Evaluator for MeanReversionParams {
    fn evaluate(&mut self, price: f64, _now: DateTime<Utc>) -> Option<Signal> {
        self.price_history.push_back(price);
        while self.price_history.len() > self.lookback_period {
            self.price_history.pop_front();
        }
        if self.price_history.len() < self.lookback_period {
            return None;
        }

        let z = z_score(self.price_history.make_contiguous(), price)?;
        let side = if z <= -self.threshold {
            OrderSide::Buy
        } else if z >= self.threshold {
            OrderSide::Sell
        } else {
            return None;
        };
        Some(Signal {
            side,
            amount: self.trade_amount.clone(),
            trigger: SignalTrigger::MeanReversion { z_score: z },
        })
    }
}
