//! Deterministic demo feed.
//!
//! Generates price, volume, sentiment and KOL activity for a fixed token set
//! so the full pipeline can run without live upstreams. Purely a function of
//! the tick counter, which keeps demo runs reproducible.

use crate::store::MemorySampleStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokenwatch_core::{
    KolCategory, KolProfile, KolTransaction, SentimentSample, SentimentSource, TokenInfo,
    TradeSide,
};

const TOKENS: [(&str, &str, &str, f64); 3] = [
    ("DemoMoon1111111111111111111111111111111111", "MOON", "Moonshot", 0.004),
    ("DemoSink2222222222222222222222222222222222", "SINK", "Sinkhole", 1.25),
    ("DemoCalm3333333333333333333333333333333333", "CALM", "Calmcoin", 18.0),
];

/// Every this many ticks, MOON gets a short pump window that should trip a
/// 50% price-change rule, and SINK a matching volume spike.
const PUMP_PERIOD: u64 = 180;
const PUMP_WIDTH: u64 = 6;

const SOURCES: [SentimentSource; 4] = [
    SentimentSource::Twitter,
    SentimentSource::Telegram,
    SentimentSource::Reddit,
    SentimentSource::Discord,
];

pub fn demo_tokens() -> Vec<TokenInfo> {
    TOKENS
        .iter()
        .map(|(address, symbol, name, _)| TokenInfo::new(*address, *symbol, *name))
        .collect()
}

pub fn kol_profiles() -> Vec<KolProfile> {
    vec![
        KolProfile {
            wallet_address: "DemoWhale111111111111111111111111111111111".into(),
            category: KolCategory::Institution,
            influence_score: 85.0,
            success_rate: 75.0,
            verified: true,
        },
        KolProfile {
            wallet_address: "DemoTrader22222222222222222222222222222222".into(),
            category: KolCategory::Trader,
            influence_score: 55.0,
            success_rate: 60.0,
            verified: false,
        },
        KolProfile {
            wallet_address: "DemoShill333333333333333333333333333333333".into(),
            category: KolCategory::Influencer,
            influence_score: 30.0,
            success_rate: 35.0,
            verified: false,
        },
    ]
}

pub struct DemoFeed {
    tick: u64,
}

impl DemoFeed {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    fn in_pump_window(tick: u64) -> bool {
        tick % PUMP_PERIOD < PUMP_WIDTH && tick >= PUMP_PERIOD
    }

    /// Advance one tick: write samples into the store and return any KOL
    /// transactions that occurred this tick.
    pub fn step(
        &mut self,
        store: &MemorySampleStore,
        now: DateTime<Utc>,
    ) -> Vec<(KolProfile, KolTransaction)> {
        let tick = self.tick;
        self.tick += 1;

        for (idx, (address, _, _, base)) in TOKENS.iter().enumerate() {
            let phase = tick as f64 * 0.05 + idx as f64;
            let mut price = base * (1.0 + phase.sin() * 0.03);
            let mut volume = 1_000.0 * (1.0 + (phase * 0.7).cos() * 0.2);

            if Self::in_pump_window(tick) {
                match idx {
                    0 => price *= 1.8,
                    1 => volume *= 9.0,
                    _ => {}
                }
            }

            store.push_price(address, price, now);
            store.push_volume(address, volume, now);

            if tick % 12 == 0 {
                store.push_sentiment(self.sentiment_sample(idx, address, tick, now));
            }
        }

        let mut txs = Vec::new();
        if tick > 0 && tick % 90 == 0 {
            let profiles = kol_profiles();
            let profile = profiles[(tick / 90) as usize % profiles.len()].clone();
            let (address, _, _, base) = TOKENS[(tick / 90) as usize % TOKENS.len()];
            let value_in_base = 5.0 + (tick % 7) as f64 * 12.0;
            let tx = KolTransaction {
                wallet_address: profile.wallet_address.clone(),
                token_address: address.into(),
                side: if tick % 180 == 0 { TradeSide::Sell } else { TradeSide::Buy },
                amount: value_in_base / base,
                price: base,
                value_in_base,
                timestamp: now,
            };
            store.push_kol_transaction(tx.clone());
            txs.push((profile, tx));
        }
        txs
    }

    fn sentiment_sample(
        &self,
        idx: usize,
        address: &str,
        tick: u64,
        now: DateTime<Utc>,
    ) -> SentimentSample {
        // MOON runs hot, SINK bleeds, CALM stays flat.
        let score = match idx {
            0 => 55.0 + (tick as f64 * 0.01).sin() * 40.0,
            1 => -45.0 - (tick as f64 * 0.013).cos() * 30.0,
            _ => (tick as f64 * 0.02).sin() * 10.0,
        };
        let mentions = 40 + (tick % 50) as u32 + if idx == 0 { 60 } else { 0 };
        let positive = ((score.max(0.0) / 100.0) * mentions as f64) as u32;
        let negative = ((score.min(0.0).abs() / 100.0) * mentions as f64) as u32;

        let mut keywords = HashMap::new();
        if score > 40.0 {
            keywords.insert("moon".to_string(), mentions / 4);
            keywords.insert("pump".to_string(), mentions / 6);
        } else if score < -40.0 {
            keywords.insert("rug".to_string(), mentions / 4);
            keywords.insert("dump".to_string(), mentions / 6);
        }

        SentimentSample {
            token_address: address.into(),
            source: SOURCES[(tick / 12) as usize % SOURCES.len()],
            score,
            positive_count: positive,
            negative_count: negative,
            neutral_count: mentions.saturating_sub(positive + negative),
            total_mentions: mentions,
            keyword_histogram: keywords,
            influencer_mentions: if idx == 0 { 4 } else { 1 },
            volume_spike: Self::in_pump_window(tick),
            trending_score: if idx == 0 { 80.0 } else { 30.0 },
            timestamp: now,
        }
    }
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tokenwatch_core::Timeframe;
    use tokenwatch_engine::SampleStore;

    #[tokio::test]
    async fn feed_is_deterministic() {
        let now = Utc::now();
        let (store_a, store_b) = (MemorySampleStore::new(), MemorySampleStore::new());
        let (mut feed_a, mut feed_b) = (DemoFeed::new(), DemoFeed::new());

        for i in 0..200 {
            let at = now + Duration::seconds(i);
            feed_a.step(&store_a, at);
            feed_b.step(&store_b, at);
        }

        let moon = TOKENS[0].0;
        let a = store_a.recent_price_samples(moon, Timeframe::H24).await.unwrap();
        let b = store_b.recent_price_samples(moon, Timeframe::H24).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[tokio::test]
    async fn pump_window_moves_price_past_fifty_percent() {
        let now = Utc::now();
        let store = MemorySampleStore::new();
        let mut feed = DemoFeed::new();

        for i in 0..=(PUMP_PERIOD as i64) {
            feed.step(&store, now + Duration::seconds(i));
        }

        let prices = store
            .recent_price_samples(TOKENS[0].0, Timeframe::H24)
            .await
            .unwrap();
        let max_jump = prices
            .windows(2)
            .map(|p| (p[1].price - p[0].price) / p[0].price * 100.0)
            .fold(f64::MIN, f64::max);
        assert!(max_jump > 50.0, "pump window should exceed 50%, got {max_jump:.1}%");
    }

    #[test]
    fn kol_transactions_cycle_through_profiles() {
        let now = Utc::now();
        let store = MemorySampleStore::new();
        let mut feed = DemoFeed::new();

        let mut seen = Vec::new();
        for _ in 0..=270 {
            for (profile, _) in feed.step(&store, now) {
                seen.push(profile.wallet_address);
            }
        }
        assert_eq!(seen.len(), 3);
        assert_ne!(seen[0], seen[1]);
    }
}
