//! Error types for action primitives

use thiserror::Error;

/// Errors raised while locating or acting on a page element
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// Element did not become resolvable before the wait expired
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Operation was cancelled by the enclosing execution
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Element is not clickable (detached, disabled or obscured)
    #[error("Element not clickable: {0}")]
    NotClickable(String),

    /// Element does not accept input
    #[error("Element not editable: {0}")]
    NotEditable(String),

    /// Handle no longer points at a live element
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Selector text could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Action completed but its post-condition did not hold
    #[error("Verification mismatch on {target}: expected {expected:?}, found {actual:?}")]
    VerificationMismatch {
        target: String,
        expected: String,
        actual: String,
    },

    /// Browser protocol or transport failure
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_)
                | ActionError::NotClickable(_)
                | ActionError::AnchorNotFound(_)
                | ActionError::VerificationMismatch { .. }
                | ActionError::CdpIo(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::CdpIo(_) | ActionError::Interrupted(_) => 2,
            ActionError::WaitTimeout(_)
            | ActionError::AnchorNotFound(_)
            | ActionError::VerificationMismatch { .. } => 1,
            _ => 0,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActionError::Interrupted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_is_retryable_but_invalid_selector_is_not() {
        let mismatch = ActionError::VerificationMismatch {
            target: "#email".into(),
            expected: "a@b.c".into(),
            actual: String::new(),
        };
        assert!(mismatch.is_retryable());
        assert!(!ActionError::InvalidSelector(String::new()).is_retryable());
    }

    #[test]
    fn mismatch_message_quotes_values() {
        let err = ActionError::VerificationMismatch {
            target: "#email".into(),
            expected: "a@b.c".into(),
            actual: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Verification mismatch on #email: expected \"a@b.c\", found \"\""
        );
    }

    #[test]
    fn interruption_is_the_only_cancellation() {
        assert!(ActionError::Interrupted("stop".into()).is_cancellation());
        assert!(!ActionError::WaitTimeout("slow".into()).is_cancellation());
        assert_eq!(ActionError::Internal("x".into()).severity(), 3);
    }
}
