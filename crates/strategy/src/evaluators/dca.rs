use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use common::{parse_positive_decimal, Error, OrderSide, Result};

use crate::{Evaluator, Signal, SignalTrigger};

/// Dollar-cost averaging: buy a fixed amount every `interval_minutes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcaParams {
    pub amount_per_trade: String,
    pub interval_minutes: u64,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
}

impl DcaParams {
    pub fn new(amount_per_trade: impl Into<String>, interval_minutes: u64) -> Self {
        Self {
            amount_per_trade: amount_per_trade.into(),
            interval_minutes,
            last_execution: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        parse_positive_decimal("amount_per_trade", &self.amount_per_trade)?;
        if self.interval_minutes == 0 {
            return Err(Error::InvalidParameter(
                "interval_minutes must be greater than zero".into(),
            ));
        }
        self.interval()?;
        Ok(())
    }

    fn interval(&self) -> Result<TimeDelta> {
        i64::try_from(self.interval_minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "interval_minutes is out of range: {}",
                    self.interval_minutes
                ))
            })
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_execution, self.interval()) {
            (None, _) => true,
            (Some(last), Ok(interval)) => now - last >= interval,
            (Some(_), Err(_)) => false,
        }
    }
}

impl Evaluator for DcaParams {
    fn evaluate(&mut self, _price: f64, now: DateTime<Utc>) -> Option<Signal> {
        if !self.is_due(now) {
            return None;
        }
        Some(Signal {
            side: OrderSide::Buy,
            amount: self.amount_per_trade.clone(),
            trigger: SignalTrigger::Schedule,
        })
    }

    fn record_fill(&mut self, _signal: &Signal, now: DateTime<Utc>) {
        self.last_execution = Some(now);
    }
}
