use std::collections::BTreeMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use crate::error::Result;
use crate::models::{ChatId, PricePoint, Subscription};
use super::{PriceHistoryStore, SubscriptionStore};

type Series = BTreeMap<DateTime<Utc>, f64>;

/// In-process backend with the same semantics as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    prices: RwLock<BTreeMap<String, Series>>,
    subscriptions: RwLock<BTreeMap<ChatId, Subscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn point_count(&self, symbol: &str) -> usize {
        self.prices
            .read()
            .await
            .get(&symbol.to_uppercase())
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PriceHistoryStore for MemoryStore {
    async fn save_batch(&self, points: &[PricePoint]) -> Result<()> {
        let mut prices = self.prices.write().await;
        for point in points {
            prices
                .entry(point.symbol.to_uppercase())
                .or_default()
                .insert(point.timestamp, point.value);
        }
        Ok(())
    }

    async fn latest_for(&self, symbol: &str) -> Result<Option<PricePoint>> {
        let symbol = symbol.to_uppercase();
        let prices = self.prices.read().await;
        Ok(prices.get(&symbol).and_then(|series| {
            series
                .iter()
                .next_back()
                .map(|(ts, value)| PricePoint::new(&symbol, *value, *ts))
        }))
    }

    async fn latest_all(&self) -> Result<Vec<PricePoint>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .filter_map(|(symbol, series)| {
                series
                    .iter()
                    .next_back()
                    .map(|(ts, value)| PricePoint::new(symbol, *value, *ts))
            })
            .collect())
    }

    async fn range_for(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        if from > to {
            return Ok(Vec::new());
        }
        let symbol = symbol.to_uppercase();
        let prices = self.prices.read().await;
        Ok(prices
            .get(&symbol)
            .map(|series| {
                series
                    .range(from..=to)
                    .map(|(ts, value)| PricePoint::new(&symbol, *value, *ts))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn enable(&self, chat_id: ChatId, interval_minutes: i32) -> Result<()> {
        self.subscriptions.write().await.insert(
            chat_id,
            Subscription {
                chat_id,
                enabled: true,
                interval_minutes,
                last_sent_at: None,
            },
        );
        Ok(())
    }

    async fn disable(&self, chat_id: ChatId) -> Result<()> {
        if let Some(sub) = self.subscriptions.write().await.get_mut(&chat_id) {
            sub.enabled = false;
        }
        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ChatId>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .filter(|s| s.is_due(now))
            .map(|s| s.chat_id)
            .collect())
    }

    async fn mark_sent(&self, chat_id: ChatId, at: DateTime<Utc>) -> Result<()> {
        if let Some(sub) = self.subscriptions.write().await.get_mut(&chat_id) {
            sub.last_sent_at = Some(at);
        }
        Ok(())
    }

    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().await.get(&chat_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_save_batch_upserts_on_symbol_and_timestamp() {
        let store = MemoryStore::new();
        store.save_batch(&[PricePoint::new("btc", 100.0, t0())]).await.unwrap();
        store.save_batch(&[PricePoint::new("BTC", 101.0, t0())]).await.unwrap();

        assert_eq!(store.point_count("BTC").await, 1);
        let latest = store.latest_for("BTC").await.unwrap().unwrap();
        assert_eq!(latest.value, 101.0);
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_ordered() {
        let store = MemoryStore::new();
        let points = vec![
            PricePoint::new("ETH", 3.0, t0()),
            PricePoint::new("ETH", 1.0, t0() - Duration::hours(2)),
            PricePoint::new("ETH", 2.0, t0() - Duration::hours(1)),
        ];
        store.save_batch(&points).await.unwrap();

        let range = store
            .range_for("eth", t0() - Duration::hours(1), t0())
            .await
            .unwrap();
        let values: Vec<f64> = range.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 3.0]);

        assert!(store.range_for("ETH", t0(), t0() - Duration::hours(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_all_skips_empty_symbols() {
        let store = MemoryStore::new();
        store
            .save_batch(&[
                PricePoint::new("ETH", 2.0, t0()),
                PricePoint::new("BTC", 1.0, t0() - Duration::minutes(5)),
                PricePoint::new("BTC", 1.5, t0()),
            ])
            .await
            .unwrap();

        let latest = store.latest_all().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].symbol, "BTC");
        assert_eq!(latest[0].value, 1.5);
        assert!(store.latest_for("DOGE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enable_resets_last_sent() {
        let store = MemoryStore::new();
        store.enable(7, 10).await.unwrap();
        store.mark_sent(7, t0()).await.unwrap();
        assert!(store.find_due(t0()).await.unwrap().is_empty());

        store.enable(7, 30).await.unwrap();
        let sub = store.get(7).await.unwrap().unwrap();
        assert_eq!(sub.interval_minutes, 30);
        assert!(sub.last_sent_at.is_none());
        assert_eq!(store.find_due(t0()).await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_disable_unknown_chat_is_noop() {
        let store = MemoryStore::new();
        store.disable(42).await.unwrap();
        assert!(store.get(42).await.unwrap().is_none());
    }
}
