//! Error types for condition parsing.

use thiserror::Error;

/// Condition error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// The stored metadata names an operator the evaluator does not know.
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// The condition is not valid JSON.
    #[error("Invalid condition JSON: {0}")]
    InvalidJson(String),
}

/// Result type for condition operations.
pub type ConditionResult<T> = Result<T, ConditionError>;

impl From<serde_json::Error> for ConditionError {
    fn from(err: serde_json::Error) -> Self {
        ConditionError::InvalidJson(err.to_string())
    }
}
