use std::time::Duration;

use crate::{Error, PriceSourceKind, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Market data
    pub price_source: PriceSourceKind,
    pub tick_interval: Duration,
    /// Instruments refreshed every cycle even without alerts or strategies.
    pub watchlist: Vec<String>,

    // Paper simulation
    pub paper_seed: Option<u64>,
    pub paper_volatility_bps: f64,

    // Strategy config file path
    pub strategy_config_path: Option<String>,

    // Telegram
    pub telegram_token: Option<String>,
    pub telegram_allowed_user_ids: Vec<i64>,
}

impl Config {
    const DEFAULT_TICK_MS: u64 = 10_000;
    const DEFAULT_WATCHLIST: &'static str = "BTC-USD,ETH-USD";
    const DEFAULT_VOLATILITY_BPS: f64 = 50.0;

    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the environment in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let price_source = match lookup("PRICE_SOURCE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => PriceSourceKind::Paper,
            "binance" => PriceSourceKind::Binance,
            other => {
                return Err(Error::Config(format!(
                    "PRICE_SOURCE must be 'paper' or 'binance', got: '{other}'"
                )))
            }
        };

        let tick_ms = parse_or("TICK_INTERVAL_MS", lookup("TICK_INTERVAL_MS"), Self::DEFAULT_TICK_MS)?;
        if tick_ms == 0 {
            return Err(Error::Config("TICK_INTERVAL_MS must be greater than zero".into()));
        }

        let watchlist = split_list(
            &lookup("WATCHLIST").unwrap_or_else(|| Self::DEFAULT_WATCHLIST.to_string()),
        );

        let paper_seed = match lookup("PAPER_SEED") {
            Some(v) => Some(v.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("PAPER_SEED must be an unsigned integer, got: '{v}'"))
            })?),
            None => None,
        };

        let paper_volatility_bps = parse_or(
            "PAPER_VOLATILITY_BPS",
            lookup("PAPER_VOLATILITY_BPS"),
            Self::DEFAULT_VOLATILITY_BPS,
        )?;
        if !paper_volatility_bps.is_finite() || paper_volatility_bps < 0.0 {
            return Err(Error::Config(format!(
                "PAPER_VOLATILITY_BPS must be a non-negative number, got: {paper_volatility_bps}"
            )));
        }

        let telegram_token = lookup("TELEGRAM_TOKEN").filter(|t| !t.trim().is_empty());
        let telegram_allowed_user_ids = match lookup("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|s| {
                    s.parse::<i64>().map_err(|_| {
                        Error::Config(format!(
                            "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        if telegram_token.is_some() && telegram_allowed_user_ids.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ALLOWED_USER_IDS is required when TELEGRAM_TOKEN is set".into(),
            ));
        }

        Ok(Config {
            price_source,
            tick_interval: Duration::from_millis(tick_ms),
            watchlist,
            paper_seed,
            paper_volatility_bps,
            strategy_config_path: lookup("STRATEGY_CONFIG_PATH").filter(|p| !p.trim().is_empty()),
            telegram_token,
            telegram_allowed_user_ids,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{v}'"))),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.price_source, PriceSourceKind::Paper);
        assert_eq!(cfg.tick_interval, Duration::from_secs(10));
        assert_eq!(cfg.watchlist, vec!["BTC-USD", "ETH-USD"]);
        assert!(cfg.telegram_token.is_none());
        assert!(cfg.strategy_config_path.is_none());
    }

    #[test]
    fn watchlist_is_trimmed_and_split() {
        let cfg = config_from(&[("WATCHLIST", " SOL-USD , ,ETH-USD")]).unwrap();
        assert_eq!(cfg.watchlist, vec!["SOL-USD", "ETH-USD"]);
    }

    #[test]
    fn unknown_price_source_is_rejected() {
        let err = config_from(&[("PRICE_SOURCE", "kraken")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        assert!(config_from(&[("TICK_INTERVAL_MS", "0")]).is_err());
    }

    #[test]
    fn telegram_token_requires_allowed_users() {
        assert!(config_from(&[("TELEGRAM_TOKEN", "abc")]).is_err());
        let cfg = config_from(&[
            ("TELEGRAM_TOKEN", "abc"),
            ("TELEGRAM_ALLOWED_USER_IDS", "1, 2"),
        ])
        .unwrap();
        assert_eq!(cfg.telegram_allowed_user_ids, vec![1, 2]);
    }
}
