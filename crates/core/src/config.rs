//! Alert configuration types and validation.

use crate::condition::{Condition, ConditionValue, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures surfaced to the config CRUD caller.
///
/// These reject the write; they never reach the evaluation path.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("config name must not be empty")]
    EmptyName,
    #[error("config must declare at least one condition")]
    NoConditions,
    #[error("cooldown must be at least 1 minute")]
    ZeroCooldown,
    #[error("between operator requires a [lo, hi] range")]
    BetweenWithoutRange,
    #[error("range lower bound {0} exceeds upper bound {1}")]
    InvertedRange(f64, f64),
    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
}

/// Alert priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    /// Base alert score for this priority, 0-100.
    pub fn base_score(self) -> u8 {
        match self {
            AlertPriority::Low => 55,
            AlertPriority::Medium => 70,
            AlertPriority::High => 85,
            AlertPriority::Critical => 95,
        }
    }
}

/// What kind of side effect an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Fan out to the in-process broadcast sink
    Notification,
    /// Delegated to an external mail collaborator
    Email,
    /// Delegated to an external webhook collaborator
    Webhook,
    /// Delegated to the trade execution collaborator
    AutoTrade,
}

/// One action attached to an alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub enabled: bool,
    /// Destination for delegated actions (email address, webhook URL, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Action {
    pub fn notification() -> Self {
        Self {
            kind: ActionKind::Notification,
            enabled: true,
            target: None,
        }
    }
}

/// A user-owned alert configuration, the durable source of truth for what
/// to watch and how to react.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Database ID (0 until persisted)
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub is_active: bool,
    /// Evaluated in declared order; the first trigger wins.
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    /// Minimum minutes between two triggers of this config.
    pub cooldown_minutes: i64,
    pub priority: AlertPriority,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<DateTime<Utc>>,
}

impl AlertConfig {
    /// Whether this config is still cooling down at `now`.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered_at {
            Some(last) => now - last < chrono::Duration::minutes(self.cooldown_minutes),
            None => false,
        }
    }

    /// Validate the config before it is written or activated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.conditions.is_empty() {
            return Err(ValidationError::NoConditions);
        }
        if self.cooldown_minutes < 1 {
            return Err(ValidationError::ZeroCooldown);
        }
        for condition in &self.conditions {
            match condition.value {
                ConditionValue::Scalar(v) => {
                    if !v.is_finite() {
                        return Err(ValidationError::NonFiniteThreshold(v));
                    }
                    if condition.operator == Operator::Between {
                        return Err(ValidationError::BetweenWithoutRange);
                    }
                }
                ConditionValue::Range(lo, hi) => {
                    if !lo.is_finite() || !hi.is_finite() {
                        return Err(ValidationError::NonFiniteThreshold(lo));
                    }
                    if lo > hi {
                        return Err(ValidationError::InvertedRange(lo, hi));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionKind, Timeframe};
    use chrono::Duration;

    fn sample_config() -> AlertConfig {
        AlertConfig {
            id: 1,
            owner_id: 7,
            name: "pump watch".to_string(),
            is_active: true,
            conditions: vec![Condition {
                kind: ConditionKind::PriceChange,
                operator: Operator::GreaterThan,
                value: ConditionValue::Scalar(50.0),
                timeframe: Timeframe::H1,
                token_scope: None,
            }],
            actions: vec![Action::notification()],
            cooldown_minutes: 30,
            priority: AlertPriority::High,
            tags: vec!["momentum".to_string()],
            last_triggered_at: None,
        }
    }

    #[test]
    fn cooldown_window() {
        let now = Utc::now();
        let mut config = sample_config();
        assert!(!config.in_cooldown(now));

        config.last_triggered_at = Some(now - Duration::minutes(10));
        assert!(config.in_cooldown(now));

        config.last_triggered_at = Some(now - Duration::minutes(31));
        assert!(!config.in_cooldown(now));
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert_eq!(sample_config().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_configs() {
        let mut config = sample_config();
        config.name = "  ".to_string();
        assert_eq!(config.validate(), Err(ValidationError::EmptyName));

        let mut config = sample_config();
        config.conditions.clear();
        assert_eq!(config.validate(), Err(ValidationError::NoConditions));

        let mut config = sample_config();
        config.cooldown_minutes = 0;
        assert_eq!(config.validate(), Err(ValidationError::ZeroCooldown));

        let mut config = sample_config();
        config.conditions[0].operator = Operator::Between;
        assert_eq!(config.validate(), Err(ValidationError::BetweenWithoutRange));

        let mut config = sample_config();
        config.conditions[0].operator = Operator::Between;
        config.conditions[0].value = ConditionValue::Range(20.0, 10.0);
        assert_eq!(config.validate(), Err(ValidationError::InvertedRange(20.0, 10.0)));
    }

    #[test]
    fn priority_order_and_scores() {
        assert!(AlertPriority::Critical > AlertPriority::High);
        assert!(AlertPriority::Medium > AlertPriority::Low);
        assert_eq!(AlertPriority::Critical.base_score(), 95);
        assert_eq!(AlertPriority::Low.base_score(), 55);
    }
}
