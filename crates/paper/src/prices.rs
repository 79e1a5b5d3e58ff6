use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use common::{Error, MarketSnapshot, PriceSource, Result};

/// Random-walk market for paper trading.
///
/// Each instrument starts at a seed price and moves by a uniform random step
/// of at most `volatility_bps` per fetch. The 24h change is measured against
/// the starting price.
pub struct SimulatedPriceSource {
    volatility_bps: f64,
    rng: Mutex<StdRng>,
    markets: Mutex<HashMap<String, SimulatedMarket>>,
    start_prices: HashMap<String, f64>,
}

struct SimulatedMarket {
    open: f64,
    price: f64,
    volume_24h: f64,
}

impl SimulatedPriceSource {
    const FALLBACK_START_PRICE: f64 = 100.0;

    /// `seed = None` draws from OS entropy.
    pub fn new(seed: Option<u64>, volatility_bps: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start_prices = [
            ("BTC-USD", 50_000.0),
            ("ETH-USD", 3_000.0),
            ("SOL-USD", 150.0),
            ("DOGE-USD", 0.15),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            volatility_bps,
            rng: Mutex::new(rng),
            markets: Mutex::new(HashMap::new()),
            start_prices,
        }
    }

    pub fn with_start_price(mut self, instrument: impl Into<String>, price: f64) -> Self {
        self.start_prices.insert(instrument.into(), price);
        self
    }

    fn start_price(&self, instrument: &str) -> f64 {
        self.start_prices
            .get(instrument)
            .copied()
            .unwrap_or(Self::FALLBACK_START_PRICE)
    }
}

#[async_trait]
impl PriceSource for SimulatedPriceSource {
    async fn fetch(&self, instruments: &[String]) -> Result<HashMap<String, MarketSnapshot>> {
        let mut rng = self.rng.lock().await;
        let mut markets = self.markets.lock().await;
        let max_step = self.volatility_bps / 10_000.0;

        let mut out = HashMap::with_capacity(instruments.len());
        for instrument in instruments {
            let start = self.start_price(instrument);
            let market = markets.entry(instrument.clone()).or_insert_with(|| SimulatedMarket {
                open: start,
                price: start,
                volume_24h: start * 1_000.0,
            });

            if max_step > 0.0 {
                let step: f64 = rng.gen_range(-max_step..=max_step);
                market.price = (market.price * (1.0 + step)).max(f64::MIN_POSITIVE);
                let volume_step: f64 = rng.gen_range(0.95..=1.05);
                market.volume_24h *= volume_step;
            }

            let snapshot = MarketSnapshot {
                instrument: instrument.clone(),
                price: market.price,
                volume_24h: market.volume_24h,
                price_change_24h: (market.price - market.open) / market.open * 100.0,
                observed_at: Utc::now(),
            };
            debug!(pair = %instrument, price = snapshot.price, "Simulated tick");
            out.insert(instrument.clone(), snapshot);
        }
        Ok(out)
    }
}

/// Deterministic price source: returns whatever prices were last set.
///
/// Used by tests and demos. Instruments without a price are left out of
/// the fetch result, and `fail_next` makes the next fetch error.
#[derive(Default)]
pub struct StaticPriceSource {
    prices: RwLock<HashMap<String, f64>>,
    fail_next: RwLock<Option<String>>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_price(&self, instrument: &str, price: f64) {
        self.prices.write().await.insert(instrument.to_string(), price);
    }

    pub async fn clear_price(&self, instrument: &str) {
        self.prices.write().await.remove(instrument);
    }

    /// Make the next `fetch` fail with `reason`.
    pub async fn fail_next(&self, reason: impl Into<String>) {
        *self.fail_next.write().await = Some(reason.into());
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch(&self, instruments: &[String]) -> Result<HashMap<String, MarketSnapshot>> {
        if let Some(reason) = self.fail_next.write().await.take() {
            return Err(Error::PriceSource(reason));
        }
        let prices = self.prices.read().await;
        Ok(instruments
            .iter()
            .filter_map(|i| prices.get(i).map(|p| (i.clone(), MarketSnapshot::new(i.clone(), *p))))
            .collect())
    }
}
