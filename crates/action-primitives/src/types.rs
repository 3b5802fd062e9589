//! Core data types for action primitives

use healwright_core_types::ActionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Execution context for one intelligent action
///
/// Carries the cancellation token of the enclosing test execution, an
/// optional deadline and a unique action id used for tracing.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Unique identifier for this action
    pub action_id: ActionId,

    /// Cancellation token shared with the enclosing execution
    pub cancel_token: CancellationToken,

    /// Optional hard deadline for this operation
    pub deadline: Option<Instant>,
}

impl ExecCtx {
    /// Create a new execution context bound to a cancellation token
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            action_id: ActionId::new(),
            cancel_token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Derive a context for a nested action; cancelling the parent cancels it too
    pub fn child(&self) -> Self {
        Self {
            action_id: ActionId::new(),
            cancel_token: self.cancel_token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if this context has exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Get remaining time until deadline, if one is set
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for ExecCtx {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Live reference to an element resolved on a page
///
/// The `id` is driver-specific (a DOM marker token for CDP pages, the element
/// id for in-memory pages).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,

    /// Selector that produced this handle, when it came from one
    pub selector: Option<String>,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, selector: Option<String>) -> Self {
        Self {
            id: id.into(),
            selector,
        }
    }

    /// Short label for logs and error messages
    pub fn label(&self) -> &str {
        self.selector.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Some(selector) => write!(f, "{} ({})", self.id, selector),
            None => f.write_str(&self.id),
        }
    }
}

/// The two action kinds that go through healing resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Fill,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
