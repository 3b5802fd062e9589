//! Error types for the Chromium driver

use action_primitives::ActionError;
use thiserror::Error;

/// Errors raised while launching or talking to Chromium
#[derive(Debug, Error)]
pub enum CdpError {
    /// No usable browser executable was found
    #[error("Chrome executable not found: {0}")]
    ExecutableNotFound(String),

    /// Browser configuration was rejected
    #[error("Invalid browser configuration: {0}")]
    Config(String),

    /// Browser process failed to start or connect
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Protocol-level failure on an established connection
    #[error("CDP protocol error: {0}")]
    Protocol(String),
}

impl CdpError {
    /// Launch failures can succeed on a second try; missing binaries and bad configs cannot
    pub fn is_retryable(&self) -> bool {
        matches!(self, CdpError::Launch(_) | CdpError::Protocol(_))
    }
}

impl From<chromiumoxide::error::CdpError> for CdpError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        CdpError::Protocol(err.to_string())
    }
}

impl From<CdpError> for ActionError {
    fn from(err: CdpError) -> Self {
        ActionError::CdpIo(err.to_string())
    }
}
