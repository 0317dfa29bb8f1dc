//! Alert condition types.
//!
//! A condition is one rule inside an [`crate::AlertConfig`]: what to measure,
//! how to compare it, and over which lookback window. Conditions are a closed
//! set of variants so evaluators can match exhaustively instead of falling
//! through on unknown type strings.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// What a condition measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    PriceChange,
    VolumeSpike,
    SentimentChange,
    KolActivity,
    TechnicalIndicator,
    MarketCapChange,
}

impl ConditionKind {
    /// Kinds that have a wired data source. The remaining kinds are staged
    /// and always evaluate to "no trigger".
    pub fn is_implemented(self) -> bool {
        matches!(self, ConditionKind::PriceChange | ConditionKind::VolumeSpike)
    }
}

/// How the measured value is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    GreaterThan,
    LessThan,
    Equals,
    Between,
    /// Absolute-value comparison: |measured| >= threshold
    PercentageChange,
}

/// Threshold value: a single scalar or an inclusive range (for `Between`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Scalar(f64),
    Range(f64, f64),
}

impl ConditionValue {
    /// The scalar threshold, or the lower bound of a range.
    pub fn scalar(&self) -> f64 {
        match self {
            ConditionValue::Scalar(v) => *v,
            ConditionValue::Range(lo, _) => *lo,
        }
    }
}

/// Sample lookback window for a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "24h")]
    H24,
}

impl Timeframe {
    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::H24 => 1440,
        }
    }

    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes())
    }
}

/// One rule inside an alert configuration.
///
/// Immutable once evaluated; owned by its config, never independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub operator: Operator,
    pub value: ConditionValue,
    pub timeframe: Timeframe,
    /// Restrict the condition to one token; `None` means every tracked token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_scope: Option<CompactString>,
}

impl Condition {
    /// Apply the condition's operator to a measured value.
    pub fn compare(&self, measured: f64) -> bool {
        match (self.operator, self.value) {
            (Operator::GreaterThan, v) => measured > v.scalar(),
            (Operator::LessThan, v) => measured < v.scalar(),
            (Operator::Equals, v) => (measured - v.scalar()).abs() < f64::EPSILON * 100.0,
            (Operator::Between, ConditionValue::Range(lo, hi)) => measured >= lo && measured <= hi,
            // Between without a range never matches; rejected at validation
            (Operator::Between, ConditionValue::Scalar(_)) => false,
            (Operator::PercentageChange, v) => measured.abs() >= v.scalar(),
        }
    }
}
