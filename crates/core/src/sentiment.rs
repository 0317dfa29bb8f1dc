//! Social sentiment sample and analysis types.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Social feed a sentiment sample was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    Twitter,
    Telegram,
    Reddit,
    Discord,
}

impl SentimentSource {
    /// Fixed per-source weight used by the composite score.
    ///
    /// Twitter is the primary feed; Discord skews noisy and is discounted.
    pub fn weight(self) -> f64 {
        match self {
            SentimentSource::Twitter => 1.5,
            SentimentSource::Telegram => 1.3,
            SentimentSource::Reddit => 1.2,
            SentimentSource::Discord => 0.8,
        }
    }
}

/// One immutable sentiment observation for a token from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub token_address: CompactString,
    pub source: SentimentSource,
    /// Raw sentiment score, -100 (max bearish) to 100 (max bullish)
    pub score: f64,
    pub positive_count: u32,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub total_mentions: u32,
    /// Keyword -> occurrence count within the sample window
    #[serde(default)]
    pub keyword_histogram: HashMap<String, u32>,
    pub influencer_mentions: u32,
    pub volume_spike: bool,
    /// Platform trending score, 0-100
    pub trending_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Short-window slope classification of a token's sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

/// Risk classification for an aggregated analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Derived trading recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// Coarse direction bucket for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl OverallSentiment {
    pub fn from_score(score: f64) -> Self {
        if score > 20.0 {
            OverallSentiment::Bullish
        } else if score < -20.0 {
            OverallSentiment::Bearish
        } else {
            OverallSentiment::Neutral
        }
    }
}

/// Per-token aggregate produced by the sentiment aggregator.
///
/// Ephemeral: recomputed every cycle, persisted only as a history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub token_address: CompactString,
    pub overall_sentiment: OverallSentiment,
    /// Composite time-decayed, source-weighted score, -100 to 100
    pub sentiment_score: f64,
    /// How trustworthy the analysis is, 0-100
    pub confidence: f64,
    pub trend_direction: TrendDirection,
    /// Scaled social mention volume, 0-100
    pub social_volume: f64,
    /// Scaled influencer mention activity, 0-100
    pub influencer_activity: f64,
    pub key_signals: Vec<String>,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_weights_rank_primary_feed_highest() {
        assert!(SentimentSource::Twitter.weight() > SentimentSource::Telegram.weight());
        assert!(SentimentSource::Telegram.weight() > SentimentSource::Reddit.weight());
        assert!(SentimentSource::Reddit.weight() > SentimentSource::Discord.weight());
    }

    #[test]
    fn overall_sentiment_buckets() {
        assert_eq!(OverallSentiment::from_score(45.0), OverallSentiment::Bullish);
        assert_eq!(OverallSentiment::from_score(-45.0), OverallSentiment::Bearish);
        assert_eq!(OverallSentiment::from_score(5.0), OverallSentiment::Neutral);
    }
}
