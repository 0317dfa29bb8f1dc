//! Alert and trigger types.

use crate::condition::ConditionKind;
use crate::config::AlertPriority;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Where an alert originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Produced by a configured condition triggering
    ConditionTrigger,
    /// Produced by the sentiment aggregator on a fast-moving shift
    Sentiment,
    /// Produced by a high-confidence KOL trade signal
    KolSignal,
}

/// Ephemeral result of one condition evaluating true.
///
/// Lives only within a single dispatcher cycle; the durable record is the
/// [`Alert`] built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub token_address: CompactString,
    pub kind: ConditionKind,
    pub current_value: f64,
    pub threshold_value: f64,
    pub message: String,
    /// Extra evaluation context for the notification payload
    pub data: serde_json::Value,
}

/// Durable alert record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Database ID (0 until persisted)
    pub id: i64,
    pub token_address: CompactString,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    /// Urgency score 0-100, derived from the source priority/risk
    pub score: u8,
    /// Human-readable descriptions of the conditions that fired
    pub conditions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Alert {
    /// Build an unpersisted alert from a trigger and its config's priority.
    pub fn from_trigger(trigger: &Trigger, priority: AlertPriority, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            token_address: trigger.token_address.clone(),
            kind: AlertKind::ConditionTrigger,
            title: title.into(),
            message: trigger.message.clone(),
            score: priority.base_score(),
            conditions: vec![format!(
                "{:?}: {:.4} vs threshold {:.4}",
                trigger.kind, trigger.current_value, trigger.threshold_value
            )],
            timestamp: Utc::now(),
            is_read: false,
        }
    }
}
