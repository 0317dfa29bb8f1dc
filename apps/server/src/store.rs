//! In-memory sample store backing the demo server.
//!
//! Holds bounded per-token time series; the engine reads them through the
//! [`SampleStore`] trait. Production deployments replace this with the
//! market-data and social-feed services.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokenwatch_core::{KolTransaction, SentimentSample, Timeframe, TokenInfo};
use tokenwatch_engine::{EngineResult, PricePoint, SampleStore, VolumePoint};

/// Samples older than this are evicted on write.
const RETENTION_HOURS: i64 = 25;

#[derive(Default)]
pub struct MemorySampleStore {
    tokens: DashMap<String, TokenInfo>,
    prices: DashMap<String, Vec<PricePoint>>,
    volumes: DashMap<String, Vec<VolumePoint>>,
    sentiment: DashMap<String, Vec<SentimentSample>>,
    kol_txs: DashMap<String, Vec<KolTransaction>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_token(&self, info: TokenInfo) {
        self.tokens.insert(info.address.to_string(), info);
    }

    pub fn push_price(&self, token: &str, price: f64, timestamp: DateTime<Utc>) {
        let mut series = self.prices.entry(token.to_string()).or_default();
        series.push(PricePoint { price, timestamp });
        evict(series.value_mut(), timestamp, |p: &PricePoint| p.timestamp);
    }

    pub fn push_volume(&self, token: &str, volume: f64, timestamp: DateTime<Utc>) {
        let mut series = self.volumes.entry(token.to_string()).or_default();
        series.push(VolumePoint { volume, timestamp });
        evict(series.value_mut(), timestamp, |v: &VolumePoint| v.timestamp);
    }

    pub fn push_sentiment(&self, sample: SentimentSample) {
        let mut series = self
            .sentiment
            .entry(sample.token_address.to_string())
            .or_default();
        let at = sample.timestamp;
        series.push(sample);
        evict(series.value_mut(), at, |s: &SentimentSample| s.timestamp);
    }

    pub fn push_kol_transaction(&self, tx: KolTransaction) {
        let mut series = self
            .kol_txs
            .entry(tx.wallet_address.to_string())
            .or_default();
        let at = tx.timestamp;
        series.push(tx);
        evict(series.value_mut(), at, |t: &KolTransaction| t.timestamp);
    }
}

fn evict<T>(series: &mut Vec<T>, now: DateTime<Utc>, at: impl Fn(&T) -> DateTime<Utc>) {
    let horizon = now - Duration::hours(RETENTION_HOURS);
    series.retain(|item| at(item) >= horizon);
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn tracked_tokens(&self) -> EngineResult<Vec<String>> {
        let mut tokens: Vec<String> = self.tokens.iter().map(|e| e.key().clone()).collect();
        tokens.sort();
        Ok(tokens)
    }

    async fn recent_price_samples(
        &self,
        token: &str,
        timeframe: Timeframe,
    ) -> EngineResult<Vec<PricePoint>> {
        let cutoff = Utc::now() - timeframe.as_duration();
        Ok(self
            .prices
            .get(token)
            .map(|series| {
                series
                    .iter()
                    .filter(|p| p.timestamp >= cutoff)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn recent_volume_samples(
        &self,
        token: &str,
        timeframe: Timeframe,
    ) -> EngineResult<Vec<VolumePoint>> {
        let cutoff = Utc::now() - timeframe.as_duration();
        Ok(self
            .volumes
            .get(token)
            .map(|series| {
                series
                    .iter()
                    .filter(|v| v.timestamp >= cutoff)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn sentiment_samples(
        &self,
        token: &str,
        hours: i64,
    ) -> EngineResult<Vec<SentimentSample>> {
        let cutoff = Utc::now() - Duration::hours(hours);
        Ok(self
            .sentiment
            .get(token)
            .map(|series| {
                series
                    .iter()
                    .filter(|s| s.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn kol_transactions(
        &self,
        wallet: &str,
        limit: usize,
    ) -> EngineResult<Vec<KolTransaction>> {
        Ok(self
            .kol_txs
            .get(wallet)
            .map(|series| series.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn token_display_info(&self, address: &str) -> EngineResult<Option<TokenInfo>> {
        Ok(self.tokens.get(address).map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOKEN: &str = "TokenAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn timeframe_window_filters_old_samples() {
        let store = MemorySampleStore::new();
        let now = Utc::now();

        store.push_price(TOKEN, 1.0, now - Duration::hours(2));
        store.push_price(TOKEN, 1.2, now - Duration::minutes(30));
        store.push_price(TOKEN, 1.5, now - Duration::minutes(1));

        let hour = store
            .recent_price_samples(TOKEN, Timeframe::H1)
            .await
            .unwrap();
        assert_eq!(hour.len(), 2);
        assert_eq!(hour[0].price, 1.2);

        let five = store
            .recent_price_samples(TOKEN, Timeframe::M5)
            .await
            .unwrap();
        assert_eq!(five.len(), 1);
        assert_eq!(five[0].price, 1.5);
    }

    #[tokio::test]
    async fn retention_evicts_stale_samples() {
        let store = MemorySampleStore::new();
        let now = Utc::now();

        store.push_price(TOKEN, 1.0, now - Duration::hours(30));
        store.push_price(TOKEN, 2.0, now);

        let day = store
            .recent_price_samples(TOKEN, Timeframe::H24)
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].price, 2.0);
    }

    #[tokio::test]
    async fn tracked_tokens_are_sorted_registrations() {
        let store = MemorySampleStore::new();
        store.register_token(TokenInfo::new("bbb", "B", "Token B"));
        store.register_token(TokenInfo::new("aaa", "A", "Token A"));

        assert_eq!(
            store.tracked_tokens().await.unwrap(),
            vec!["aaa".to_string(), "bbb".to_string()]
        );
    }

    #[tokio::test]
    async fn kol_transactions_newest_first_with_limit() {
        let store = MemorySampleStore::new();
        let now = Utc::now();
        let wallet = "WalletKOL1111111111111111111111111111111111";

        for i in 0..5 {
            store.push_kol_transaction(KolTransaction {
                wallet_address: wallet.into(),
                token_address: TOKEN.into(),
                side: tokenwatch_core::TradeSide::Buy,
                amount: 100.0,
                price: 1.0,
                value_in_base: i as f64,
                timestamp: now + Duration::minutes(i),
            });
        }

        let recent = store.kol_transactions(wallet, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].value_in_base, 4.0);
        assert_eq!(recent[1].value_in_base, 3.0);
    }
}
