//! Error types for locator resolution

use thiserror::Error;

/// Conditions that abort a resolution instead of being absorbed into the
/// healing log.
///
/// Exhausting every candidate is not an error: it is reported as an
/// unsuccessful [`crate::ActionOutcome`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// The enclosing execution was stopped while resolving
    #[error("Resolution cancelled: {0}")]
    Cancelled(String),

    /// The enclosing execution's deadline passed while resolving
    #[error("Resolution deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Cancelled(_) | LocatorError::DeadlineExceeded(_) => 2,
        }
    }

    /// Whether this error stems from the caller stopping the execution
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            LocatorError::Cancelled(_) | LocatorError::DeadlineExceeded(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_is_a_non_retryable_stop() {
        for err in [
            LocatorError::Cancelled("token fired".into()),
            LocatorError::DeadlineExceeded("test timeout".into()),
        ] {
            assert!(err.is_cancellation(), "{err}");
            assert!(!err.is_retryable(), "{err}");
            assert_eq!(err.severity(), 2, "{err}");
        }
    }
}
