//! Core types for locator resolution

use action_primitives::{ActionError, ElementHandle, PageDriver};
use futures::future::BoxFuture;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default priority assigned to authored strategies
pub const DEFAULT_PRIORITY: u8 = 5;

/// Strategy name used when an authored strategy has no name
pub const INLINE_STRATEGY: &str = "inline";

/// Future returned by a [`DerivedLocator`]
pub type DeriveFuture = BoxFuture<'static, Result<ElementHandle, ActionError>>;

type DeriveFn = dyn Fn(Arc<dyn PageDriver>) -> DeriveFuture + Send + Sync;

/// A locator computed from the live page rather than written as selector text.
///
/// Derived locators have no textual identity: they are never deduplicated and
/// never persisted.
#[derive(Clone)]
pub struct DerivedLocator {
    label: String,
    derive: Arc<DeriveFn>,
}

impl DerivedLocator {
    pub fn new<F>(label: impl Into<String>, derive: F) -> Self
    where
        F: Fn(Arc<dyn PageDriver>) -> DeriveFuture + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            derive: Arc::new(derive),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Produce a live handle from `page`
    pub fn derive(&self, page: Arc<dyn PageDriver>) -> DeriveFuture {
        (self.derive)(page)
    }
}

impl fmt::Debug for DerivedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedLocator")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// How a strategy finds its element
#[derive(Debug, Clone)]
pub enum Locator {
    /// Selector text in the driver's selector syntax
    Selector(String),

    /// Closure deriving a handle from the page
    Derived(DerivedLocator),
}

impl Locator {
    pub fn selector(text: impl Into<String>) -> Self {
        Locator::Selector(text.into())
    }

    /// Selector text, if this is a string locator
    pub fn as_selector(&self) -> Option<&str> {
        match self {
            Locator::Selector(text) => Some(text),
            Locator::Derived(_) => None,
        }
    }

    /// Blank selectors are never tried
    pub fn is_usable(&self) -> bool {
        match self {
            Locator::Selector(text) => !text.trim().is_empty(),
            Locator::Derived(_) => true,
        }
    }

    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            Locator::Selector(text) => text.clone(),
            Locator::Derived(derived) => format!("<derived:{}>", derived.label()),
        }
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Locator::Selector(a), Locator::Selector(b)) => a == b,
            (Locator::Derived(a), Locator::Derived(b)) => Arc::ptr_eq(&a.derive, &b.derive),
            _ => false,
        }
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.describe())
    }
}

impl From<&str> for Locator {
    fn from(text: &str) -> Self {
        Locator::Selector(text.to_string())
    }
}

impl From<String> for Locator {
    fn from(text: String) -> Self {
        Locator::Selector(text)
    }
}

/// One way of finding a logical element, as authored in a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatorStrategy {
    pub name: String,
    pub locator: Locator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: u8,
}

impl LocatorStrategy {
    pub fn new(name: impl Into<String>, locator: impl Into<Locator>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            description: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn derived(name: impl Into<String>, derived: DerivedLocator) -> Self {
        Self::new(name, Locator::Derived(derived))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Name used in the healing log
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            INLINE_STRATEGY
        } else {
            &self.name
        }
    }
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// The persisted record's current locator
    Persisted,
    /// Discovery-suggested selectors
    Ai,
    /// Previously proven selectors
    History,
    /// Structural fallbacks from discovery
    Fallback,
    /// Strategies written by the test author
    Authored,
}

impl CandidateSource {
    pub fn is_persisted(&self) -> bool {
        !matches!(self, CandidateSource::Authored)
    }
}

/// One entry in the ordered sequence the engine walks through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub strategy: LocatorStrategy,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(strategy: LocatorStrategy, source: CandidateSource) -> Self {
        Self { strategy, source }
    }

    pub fn locator(&self) -> &Locator {
        &self.strategy.locator
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.display_name()
    }
}

/// Knobs for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Extra rounds after the first; total rounds = `max_retries + 1`
    pub max_retries: u32,

    /// Upper bound on each candidate's element wait
    pub per_candidate_timeout: Duration,

    /// Fixed pause between failed rounds
    pub retry_backoff: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            per_candidate_timeout: Duration::from_millis(5000),
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl ResolveOptions {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_per_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.per_candidate_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Worst-case number of attempts for `candidates` candidates
    pub fn attempt_budget(&self, candidates: usize) -> usize {
        candidates * (self.max_retries as usize + 1)
    }
}

/// Result of one resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The candidate that passed verification, if any
    pub used: Option<Candidate>,

    /// Attempts made, successful or not
    pub attempts: usize,

    /// Rounds started
    pub rounds: u32,
}

impl Resolution {
    pub fn success(&self) -> bool {
        self.used.is_some()
    }
}

/// What an intelligent action reports to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_strategy: Option<LocatorStrategy>,
}

impl ActionOutcome {
    pub fn failed() -> Self {
        Self {
            success: false,
            used_strategy: None,
        }
    }

    pub fn succeeded(strategy: LocatorStrategy) -> Self {
        Self {
            success: true,
            used_strategy: Some(strategy),
        }
    }
}
