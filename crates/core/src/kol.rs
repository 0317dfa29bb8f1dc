//! KOL (key opinion leader) wallet types.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// How a tracked wallet earned its reputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KolCategory {
    Trader,
    Influencer,
    Institution,
}

/// Profile of a tracked wallet whose trades are treated as a market signal.
///
/// Mutated only by the periodic statistics recomputation over the wallet's
/// transaction history; scoring reads it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KolProfile {
    pub wallet_address: CompactString,
    pub category: KolCategory,
    /// Reach/reputation score, 0-100
    pub influence_score: f64,
    /// Historical win rate, 0-100
    pub success_rate: f64,
    pub verified: bool,
}

/// Immutable append-only record of one KOL trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KolTransaction {
    pub wallet_address: CompactString,
    pub token_address: CompactString,
    pub side: TradeSide,
    /// Token amount traded
    pub amount: f64,
    /// Price per token in the base asset
    pub price: f64,
    /// Total transaction value in the base asset (e.g. SOL)
    pub value_in_base: f64,
    pub timestamp: DateTime<Utc>,
}

/// Confidence-scored trade signal derived from one transaction + profile.
///
/// Ephemeral: recorded for history, broadcast only above the confidence gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KolSignal {
    pub wallet_address: CompactString,
    pub token_address: CompactString,
    pub side: TradeSide,
    /// 0-100, clipped
    pub confidence: f64,
    /// Human-readable justification assembled from the scoring factors
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}
