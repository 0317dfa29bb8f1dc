//! Condition evaluation over sample windows.

use crate::error::{EngineError, EngineResult};
use crate::store::SampleWindow;
use serde_json::json;
use tokenwatch_core::{Condition, ConditionKind, ConditionValue, Operator, Trigger};
use tracing::warn;

/// Evaluates a single condition against the samples gathered for its
/// timeframe window.
///
/// Evaluation never fails across this boundary: missing samples, malformed
/// configs and unwired condition kinds all report "no trigger" so that a bad
/// rule fails closed instead of erroring out a whole dispatch cycle.
#[derive(Debug, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one condition. Returns the trigger if it fired.
    pub fn evaluate(
        &self,
        condition: &Condition,
        token: &str,
        window: &SampleWindow,
    ) -> Option<Trigger> {
        let result = if condition.operator == Operator::Between
            && !matches!(condition.value, ConditionValue::Range(_, _))
        {
            Err(EngineError::InvalidCondition(
                "between operator without a range".to_string(),
            ))
        } else {
            match condition.kind {
                ConditionKind::PriceChange => self.evaluate_price_change(condition, token, window),
                ConditionKind::VolumeSpike => self.evaluate_volume_spike(condition, token, window),
                // Staged kinds without a wired data source: fail closed,
                // never trigger.
                ConditionKind::SentimentChange
                | ConditionKind::KolActivity
                | ConditionKind::TechnicalIndicator
                | ConditionKind::MarketCapChange => {
                    Err(EngineError::UnsupportedCondition(condition.kind))
                }
            }
        };

        match result {
            Ok(trigger) => trigger,
            Err(e) => {
                warn!(kind = ?condition.kind, token, error = %e, "condition evaluation failed, treating as no trigger");
                None
            }
        }
    }

    /// Percent change between consecutive price pairs; the most recent
    /// qualifying pair wins.
    fn evaluate_price_change(
        &self,
        condition: &Condition,
        token: &str,
        window: &SampleWindow,
    ) -> EngineResult<Option<Trigger>> {
        if window.prices.len() < 2 {
            return Err(EngineError::SampleUnavailable {
                token: token.to_string(),
                detail: format!("need 2+ price samples, got {}", window.prices.len()),
            });
        }

        // Walk pairs newest-first so the freshest move is reported.
        for pair in window.prices.windows(2).rev() {
            let (previous, current) = (pair[0], pair[1]);
            if previous.price == 0.0 {
                continue;
            }
            let change_percent = (current.price - previous.price) / previous.price * 100.0;
            if condition.compare(change_percent) {
                return Ok(Some(Trigger {
                    token_address: token.into(),
                    kind: condition.kind,
                    current_value: change_percent,
                    threshold_value: condition.value.scalar(),
                    message: format!(
                        "price changed {:.2}% within {}m window",
                        change_percent,
                        condition.timeframe.minutes()
                    ),
                    data: json!({
                        "previous_price": previous.price,
                        "current_price": current.price,
                        "change_percent": change_percent,
                    }),
                }));
            }
        }

        Ok(None)
    }

    /// Max/avg volume ratio over the window compared against the threshold
    /// multiple.
    fn evaluate_volume_spike(
        &self,
        condition: &Condition,
        token: &str,
        window: &SampleWindow,
    ) -> EngineResult<Option<Trigger>> {
        if window.volumes.is_empty() {
            return Err(EngineError::SampleUnavailable {
                token: token.to_string(),
                detail: "no volume samples in window".to_string(),
            });
        }

        let sum: f64 = window.volumes.iter().map(|v| v.volume).sum();
        let avg = sum / window.volumes.len() as f64;
        let max = window
            .volumes
            .iter()
            .map(|v| v.volume)
            .fold(f64::MIN, f64::max);

        if avg <= 0.0 {
            return Ok(None);
        }

        let ratio = max / avg;
        if condition.compare(ratio) {
            return Ok(Some(Trigger {
                token_address: token.into(),
                kind: condition.kind,
                current_value: ratio,
                threshold_value: condition.value.scalar(),
                message: format!(
                    "volume spiked to {:.1}x the {}m average",
                    ratio,
                    condition.timeframe.minutes()
                ),
                data: json!({
                    "average_volume": avg,
                    "max_volume": max,
                    "ratio": ratio,
                }),
            }));
        }

        Ok(None)
    }
}
