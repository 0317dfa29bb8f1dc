//! Sample store collaborator trait.
//!
//! The engine never talks to upstream feeds directly; it consumes ordered
//! time-series samples through this trait. Production deployments back it
//! with the market-data and social-feed services, tests and the demo server
//! back it with an in-memory store.

use crate::error::EngineResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokenwatch_core::{KolTransaction, SentimentSample, Timeframe, TokenInfo};

/// One price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// One volume observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Samples for one token within one condition's timeframe window.
///
/// Both series are ordered ascending by timestamp; the dispatcher assembles
/// a window per condition before handing it to the evaluator.
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
    pub prices: Vec<PricePoint>,
    pub volumes: Vec<VolumePoint>,
}

impl SampleWindow {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.volumes.is_empty()
    }
}

/// Read access to ordered per-token time-series samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Tokens currently tracked, by address.
    async fn tracked_tokens(&self) -> EngineResult<Vec<String>>;

    /// Price samples for a token within the timeframe window, ascending.
    async fn recent_price_samples(
        &self,
        token: &str,
        timeframe: Timeframe,
    ) -> EngineResult<Vec<PricePoint>>;

    /// Volume samples for a token within the timeframe window, ascending.
    async fn recent_volume_samples(
        &self,
        token: &str,
        timeframe: Timeframe,
    ) -> EngineResult<Vec<VolumePoint>>;

    /// Sentiment samples for a token from the last `hours` hours.
    async fn sentiment_samples(
        &self,
        token: &str,
        hours: i64,
    ) -> EngineResult<Vec<SentimentSample>>;

    /// Most recent transactions for a KOL wallet, newest first.
    async fn kol_transactions(
        &self,
        wallet: &str,
        limit: usize,
    ) -> EngineResult<Vec<KolTransaction>>;

    /// Display info for a token, if known.
    async fn token_display_info(&self, address: &str) -> EngineResult<Option<TokenInfo>>;
}
