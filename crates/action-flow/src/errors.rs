//! Test execution error types

use thiserror::Error;

/// Errors raised before or around a test execution.
///
/// Step failures are not errors; they are recorded in the step results.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Test case is structurally invalid
    #[error("Test validation failed: {0}")]
    ValidationFailed(String),

    /// Test case file could not be read
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// Test case file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Action primitive error
    #[error("Action primitive error: {0}")]
    ActionError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Io { .. })
    }
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        FlowError::ActionError(err.to_string())
    }
}
