use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use common::{Error, MarketSnapshot, PriceSource, Result};

/// Latest snapshot per instrument.
///
/// Written only by `refresh`. Everything else reads, either a single
/// instrument or a frozen copy of the whole map for one cycle.
pub struct MarketDataStore {
    snapshots: RwLock<HashMap<String, MarketSnapshot>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch `instruments` from `source` and overwrite their snapshots.
    ///
    /// Returns how many instruments were updated. On a source error nothing
    /// is written. Instruments the source left out keep their old snapshot.
    pub async fn refresh(&self, source: &dyn PriceSource, instruments: &[String]) -> Result<usize> {
        if instruments.is_empty() {
            return Ok(0);
        }
        let fetched = source.fetch(instruments).await?;

        let mut snapshots = self.snapshots.write().await;
        let mut updated = 0;
        for (instrument, snapshot) in fetched {
            if !instruments.contains(&instrument) {
                debug!(pair = %instrument, "Ignoring unrequested snapshot");
                continue;
            }
            snapshots.insert(instrument, snapshot);
            updated += 1;
        }
        debug!(requested = instruments.len(), updated, "Market data refreshed");
        Ok(updated)
    }

    pub async fn get(&self, instrument: &str) -> Option<MarketSnapshot> {
        self.snapshots.read().await.get(instrument).cloned()
    }

    pub async fn current_price(&self, instrument: &str) -> Result<f64> {
        self.snapshots
            .read()
            .await
            .get(instrument)
            .map(|s| s.price)
            .ok_or_else(|| Error::not_found("market snapshot", instrument))
    }

    /// Copy of every snapshot, taken once per cycle.
    pub async fn snapshot_all(&self) -> HashMap<String, MarketSnapshot> {
        self.snapshots.read().await.clone()
    }

    /// Instruments with a snapshot, sorted.
    pub async fn instruments(&self) -> Vec<String> {
        let mut out: Vec<String> = self.snapshots.read().await.keys().cloned().collect();
        out.sort();
        out
    }
}

impl Default for MarketDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper::StaticPriceSource;

    fn pairs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn refresh_overwrites_snapshots() {
        let source = StaticPriceSource::new();
        let store = MarketDataStore::new();

        source.set_price("BTC-USD", 44_000.0).await;
        assert_eq!(store.refresh(&source, &pairs(&["BTC-USD"])).await.unwrap(), 1);
        source.set_price("BTC-USD", 45_500.0).await;
        store.refresh(&source, &pairs(&["BTC-USD"])).await.unwrap();

        assert_eq!(store.current_price("BTC-USD").await.unwrap(), 45_500.0);
        assert_eq!(store.instruments().await, pairs(&["BTC-USD"]));
    }

    #[tokio::test]
    async fn unknown_instrument_is_absent_or_not_found() {
        let store = MarketDataStore::new();
        assert!(store.get("DOGE-USD").await.is_none());
        assert!(matches!(
            store.current_price("DOGE-USD").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_values() {
        let source = StaticPriceSource::new();
        let store = MarketDataStore::new();
        source.set_price("ETH-USD", 3_000.0).await;
        store.refresh(&source, &pairs(&["ETH-USD"])).await.unwrap();

        source.set_price("ETH-USD", 1.0).await;
        source.fail_next("timeout").await;
        assert!(matches!(
            store.refresh(&source, &pairs(&["ETH-USD"])).await,
            Err(Error::PriceSource(_))
        ));
        assert_eq!(store.current_price("ETH-USD").await.unwrap(), 3_000.0);
    }

    #[tokio::test]
    async fn missing_instruments_keep_their_snapshot() {
        let source = StaticPriceSource::new();
        let store = MarketDataStore::new();
        source.set_price("BTC-USD", 50_000.0).await;
        source.set_price("ETH-USD", 3_000.0).await;
        store.refresh(&source, &pairs(&["BTC-USD", "ETH-USD"])).await.unwrap();

        source.clear_price("ETH-USD").await;
        source.set_price("BTC-USD", 51_000.0).await;
        let updated = store.refresh(&source, &pairs(&["BTC-USD", "ETH-USD"])).await.unwrap();

        assert_eq!(updated, 1);
        assert_eq!(store.current_price("ETH-USD").await.unwrap(), 3_000.0);
        assert_eq!(store.snapshot_all().await["BTC-USD"].price, 51_000.0);
    }
}
