use serde::{Deserialize, Serialize};

use common::{AlertCondition, Error, Result};

use crate::StrategyParams;

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "dca"
/// name = "BTC weekly stack"
/// pair = "BTC-USD"
/// amount_per_trade = "0.001"
/// interval_minutes = 10080
///
/// [[strategy]]
/// type = "mean_reversion"
/// name = "ETH z-score"
/// pair = "ETH-USD"
/// enabled = false
/// lookback_period = 20
/// threshold = 2.0
/// trade_amount = "0.05"
///
/// [[alert]]
/// pair = "BTC-USD"
/// target_price = 45000.0
/// condition = "above"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategyConfig>,
    #[serde(rename = "alert", default)]
    pub alerts: Vec<AlertConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Human-readable name shown in logs and chat.
    #[serde(default)]
    pub name: String,
    /// Instrument, e.g. "BTC-USD".
    pub pair: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Kind (`type` key) and its parameters.
    #[serde(flatten)]
    pub params: StrategyParams,
}

/// A price alert seeded at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertConfig {
    pub pair: String,
    pub target_price: f64,
    pub condition: AlertCondition,
}

fn default_enabled() -> bool {
    true
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse strategy config at '{path}': {e}")))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}
