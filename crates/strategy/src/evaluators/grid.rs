use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ensure_positive, parse_positive_decimal, Error, OrderSide, Result};

use crate::{Evaluator, Signal, SignalTrigger};

/// Grid trading over `[lower_price, upper_price]` split into `grid_levels`
/// equal steps.
///
/// A price within a tenth of a step of a grid line is a level hit. Each hit
/// fills once per entry: the level is remembered in `filled_levels` and only
/// re-armed after price leaves that line's tolerance band. Lines at or below
/// the midpoint buy, lines above it sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub lower_price: f64,
    pub upper_price: f64,
    pub grid_levels: usize,
    pub amount_per_grid: String,
    #[serde(default)]
    pub filled_levels: BTreeSet<usize>,
}

impl GridParams {
    const TOLERANCE_FRACTION: f64 = 0.1;

    pub fn new(
        lower_price: f64,
        upper_price: f64,
        grid_levels: usize,
        amount_per_grid: impl Into<String>,
    ) -> Self {
        Self {
            lower_price,
            upper_price,
            grid_levels,
            amount_per_grid: amount_per_grid.into(),
            filled_levels: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("lower_price", self.lower_price)?;
        ensure_positive("upper_price", self.upper_price)?;
        if self.lower_price >= self.upper_price {
            return Err(Error::InvalidParameter(format!(
                "lower_price ({}) must be below upper_price ({})",
                self.lower_price, self.upper_price
            )));
        }
        if self.grid_levels == 0 {
            return Err(Error::InvalidParameter("grid_levels must be at least 1".into()));
        }
        parse_positive_decimal("amount_per_grid", &self.amount_per_grid)?;
        Ok(())
    }

    pub fn step(&self) -> f64 {
        (self.upper_price - self.lower_price) / self.grid_levels as f64
    }

    pub fn tolerance(&self) -> f64 {
        self.step() * Self::TOLERANCE_FRACTION
    }

    pub fn line_price(&self, level: usize) -> f64 {
        self.lower_price + level as f64 * self.step()
    }

    /// The grid line `price` sits on, if any, as `(level index, line price)`.
    pub fn level_at(&self, price: f64) -> Option<(usize, f64)> {
        let step = self.step();
        if !price.is_finite() || step <= 0.0 {
            return None;
        }
        let nearest = ((price - self.lower_price) / step).round();
        if nearest < 0.0 || nearest > self.grid_levels as f64 {
            return None;
        }
        let level = nearest as usize;
        let line = self.line_price(level);
        ((price - line).abs() <= self.tolerance()).then_some((level, line))
    }

    fn midpoint(&self) -> f64 {
        (self.lower_price + self.upper_price) / 2.0
    }
}

impl Evaluator for GridParams {
    fn evaluate(&mut self, price: f64, _now: DateTime<Utc>) -> Option<Signal> {
        let hit = self.level_at(price);

        // Re-arm every level price is no longer sitting on.
        self.filled_levels
            .retain(|level| hit.map(|(current, _)| current == *level).unwrap_or(false));

        let (level, line_price) = hit?;
        if self.filled_levels.contains(&level) {
            return None;
        }

        let side = if line_price <= self.midpoint() {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        Some(Signal {
            side,
            amount: self.amount_per_grid.clone(),
            trigger: SignalTrigger::GridLevel { level, line_price },
        })
    }

    fn record_fill(&mut self, signal: &Signal, _now: DateTime<Utc>) {
        if let SignalTrigger::GridLevel { level, .. } = signal.trigger {
            self.filled_levels.insert(level);
        }
    }
}
