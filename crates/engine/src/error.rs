//! Error types for engine operations.

use thiserror::Error;
use tokenwatch_core::ConditionKind;

/// Errors that can occur while evaluating or scoring.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or empty time-series for a token. Fails closed: no trigger.
    #[error("samples unavailable for {token}: {detail}")]
    SampleUnavailable { token: String, detail: String },

    #[error("condition kind {0:?} has no data source wired")]
    UnsupportedCondition(ConditionKind),

    #[error("malformed condition: {0}")]
    InvalidCondition(String),

    #[error("sample store error: {0}")]
    Store(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether this error should be swallowed as "no trigger" rather than
    /// escalated. Evaluation-path errors never escape a single condition's
    /// scope.
    pub fn fails_closed(&self) -> bool {
        matches!(
            self,
            EngineError::SampleUnavailable { .. }
                | EngineError::UnsupportedCondition(_)
                | EngineError::InvalidCondition(_)
        )
    }
}
