use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::{Error, MarketSnapshot, PriceSource, Result};

const BASE_URL: &str = "https://api.binance.com";

/// Public 24h ticker feed from Binance. Read-only, no API key needed.
pub struct BinanceTickerSource {
    base_url: String,
    http: Client,
}

impl BinanceTickerSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Binance symbol for an instrument: `BTC-USD` → `BTCUSDT`.
    ///
    /// A `USD` quote leg maps to USDT; Binance spot has no USD books.
    /// Instruments without a separator are passed through uppercased.
    pub fn symbol_for(instrument: &str) -> String {
        let instrument = instrument.trim().to_uppercase();
        match instrument.split_once(['-', '/']) {
            Some((base, "USD")) => format!("{base}USDT"),
            Some((base, quote)) => format!("{base}{quote}"),
            None => instrument,
        }
    }

    async fn ticker(&self, symbol: &str) -> Result<Ticker24h> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Http(format!("HTTP {status}: {body}")));
        }
        serde_json::from_str(&body).map_err(|e| Error::PriceSource(e.to_string()))
    }
}

#[async_trait]
impl PriceSource for BinanceTickerSource {
    async fn fetch(&self, instruments: &[String]) -> Result<HashMap<String, MarketSnapshot>> {
        let mut out = HashMap::with_capacity(instruments.len());
        let mut last_error = None;

        for instrument in instruments {
            let symbol = Self::symbol_for(instrument);
            match self.ticker(&symbol).await.and_then(|t| t.into_snapshot(instrument)) {
                Ok(snapshot) => {
                    debug!(pair = %instrument, symbol = %symbol, price = snapshot.price, "Ticker fetched");
                    out.insert(instrument.clone(), snapshot);
                }
                Err(e) => {
                    warn!(pair = %instrument, symbol = %symbol, error = %e, "Ticker fetch failed");
                    last_error = Some(e);
                }
            }
        }

        // Partial results are fine; a total outage is an error.
        match last_error {
            Some(e) if out.is_empty() => Err(Error::PriceSource(format!("Binance unavailable: {e}"))),
            _ => Ok(out),
        }
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    price_change_percent: String,
    volume: String,
}

impl Ticker24h {
    fn into_snapshot(self, instrument: &str) -> Result<MarketSnapshot> {
        let parse = |field: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|e| Error::PriceSource(format!("bad {field} '{raw}': {e}")))
        };
        Ok(MarketSnapshot {
            instrument: instrument.to_string(),
            price: parse("lastPrice", &self.last_price)?,
            volume_24h: parse("volume", &self.volume)?,
            price_change_24h: parse("priceChangePercent", &self.price_change_percent)?,
            observed_at: Utc::now(),
        })
    }
}
