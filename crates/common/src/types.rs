use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Latest known market data for one instrument.
/// The store keeps exactly one of these per instrument and overwrites it on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub instrument: String,
    pub price: f64,
    pub volume_24h: f64,
    /// 24h change in percent (e.g. `-2.5` = down 2.5%).
    pub price_change_24h: f64,
    pub observed_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(instrument: impl Into<String>, price: f64) -> Self {
        Self {
            instrument: instrument.into(),
            price,
            volume_24h: 0.0,
            price_change_24h: 0.0,
            observed_at: Utc::now(),
        }
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Status reported by the exchange client for a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Filled,
    Open,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Open => write!(f, "open"),
        }
    }
}

/// A trade the caller (or a strategy) wants submitted.
///
/// Amounts travel as decimal strings, exactly as the caller typed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub product_id: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: String,
    /// Required for limit orders, ignored for market orders.
    pub limit_price: Option<String>,
}

impl TradeRequest {
    pub fn market(product_id: impl Into<String>, side: OrderSide, amount: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            order_type: OrderType::Market,
            side,
            amount: amount.into(),
            limit_price: None,
        }
    }

    pub fn limit(
        product_id: impl Into<String>,
        side: OrderSide,
        amount: impl Into<String>,
        limit_price: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            order_type: OrderType::Limit,
            side,
            amount: amount.into(),
            limit_price: Some(limit_price.into()),
        }
    }
}

/// An executed trade. Appended to the gateway history and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub product_id: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: String,
    pub limit_price: Option<String>,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    pub executed_price: f64,
}

/// Account handle handed out by the custody provider.
/// The core only needs it to exist before trading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub address: String,
    pub network: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    /// Whether `price` satisfies this condition against `target`.
    pub fn is_met(self, price: f64, target: f64) -> bool {
        match self {
            AlertCondition::Above => price >= target,
            AlertCondition::Below => price <= target,
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::Above => write!(f, "above"),
            AlertCondition::Below => write!(f, "below"),
        }
    }
}

impl std::str::FromStr for AlertCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(Error::InvalidParameter(format!(
                "alert condition must be 'above' or 'below', got '{other}'"
            ))),
        }
    }
}

/// Current state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Stopped => write!(f, "stopped"),
            SchedulerState::Running => write!(f, "running"),
        }
    }
}

/// Where market data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    Paper,
    Binance,
}

impl std::fmt::Display for PriceSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSourceKind::Paper => write!(f, "paper"),
            PriceSourceKind::Binance => write!(f, "binance"),
        }
    }
}

/// Parse a decimal amount string, rejecting anything that is not a finite
/// positive number.
pub fn parse_positive_decimal(field: &str, value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        Error::InvalidParameter(format!("{field} must be a decimal number, got '{value}'"))
    })?;
    ensure_positive(field, parsed)?;
    Ok(parsed)
}

/// Reject non-finite and non-positive values.
pub fn ensure_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{field} must be a finite positive number, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_condition_includes_target() {
        assert!(AlertCondition::Above.is_met(45_000.0, 45_000.0));
        assert!(!AlertCondition::Above.is_met(44_999.99, 45_000.0));
    }

    #[test]
    fn below_condition_includes_target() {
        assert!(AlertCondition::Below.is_met(30_000.0, 30_000.0));
        assert!(!AlertCondition::Below.is_met(30_000.01, 30_000.0));
    }

    #[test]
    fn condition_parses_case_insensitively() {
        assert_eq!("ABOVE".parse::<AlertCondition>().unwrap(), AlertCondition::Above);
        assert_eq!(" below ".parse::<AlertCondition>().unwrap(), AlertCondition::Below);
        assert!("sideways".parse::<AlertCondition>().is_err());
    }

    #[test]
    fn decimal_amounts_must_be_positive() {
        assert_eq!(parse_positive_decimal("amount", "0.001").unwrap(), 0.001);
        assert!(parse_positive_decimal("amount", "0").is_err());
        assert!(parse_positive_decimal("amount", "-1").is_err());
        assert!(parse_positive_decimal("amount", "abc").is_err());
        assert!(parse_positive_decimal("amount", "NaN").is_err());
        assert!(parse_positive_decimal("amount", "inf").is_err());
    }
}
