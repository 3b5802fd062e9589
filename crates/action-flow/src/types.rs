//! Core types for test cases and their results

use action_locator::{HealingAction, HealingMetrics, LocatorStrategy, DEFAULT_PRIORITY};
use chrono::{DateTime, Utc};
use healwright_core_types::ExecutionId;
use serde::{Deserialize, Serialize};

/// A named sequence of steps run against one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,

    pub name: String,

    /// Scopes selector history; `None` uses the global scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<String>,

    /// Prefix for relative navigation targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// What to do when a step fails, unless the step overrides it
    #[serde(default)]
    pub failure_strategy: FailureStrategy,

    pub steps: Vec<TestStep>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            suite_id: None,
            base_url: None,
            failure_strategy: FailureStrategy::Abort,
            steps: Vec::new(),
        }
    }

    pub fn with_suite(mut self, suite_id: impl Into<String>) -> Self {
        self.suite_id = Some(suite_id.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    pub fn with_step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Absolute URL for a navigation target
    pub fn resolve_url(&self, target: &str) -> String {
        let relative = !target.contains("://") && !target.starts_with("about:");
        match (&self.base_url, relative) {
            (Some(base), true) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                target.trim_start_matches('/')
            ),
            _ => target.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub action: StepAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailureStrategy>,
}

impl TestStep {
    pub fn new(id: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            action,
            on_failure: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn on_failure(mut self, strategy: FailureStrategy) -> Self {
        self.on_failure = Some(strategy);
        self
    }
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    Navigate {
        url: String,
    },

    Click {
        /// Element name applied to strategies that do not carry one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
        strategies: Vec<StrategySpec>,
    },

    Fill {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
        strategies: Vec<StrategySpec>,
        value: String,
    },

    /// Wait until any strategy resolves; no healing, no write-back
    WaitFor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
        strategies: Vec<StrategySpec>,
        #[serde(default = "default_wait_ms")]
        timeout_ms: u64,
    },

    AssertUrl {
        contains: String,
    },
}

fn default_wait_ms() -> u64 {
    5_000
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Navigate { .. } => "navigate",
            StepAction::Click { .. } => "click",
            StepAction::Fill { .. } => "fill",
            StepAction::WaitFor { .. } => "wait_for",
            StepAction::AssertUrl { .. } => "assert_url",
        }
    }
}

/// A strategy as written in a test file: a bare selector or a full entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategySpec {
    Selector(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
    },
}

impl StrategySpec {
    pub fn selector(&self) -> &str {
        match self {
            StrategySpec::Selector(selector) => selector,
            StrategySpec::Detailed { selector, .. } => selector,
        }
    }

    /// Build the engine strategy, falling back to `element` for the name
    pub fn to_strategy(&self, element: Option<&str>) -> LocatorStrategy {
        match self {
            StrategySpec::Selector(selector) => {
                LocatorStrategy::new(element.unwrap_or_default(), selector.as_str())
            }
            StrategySpec::Detailed {
                name,
                selector,
                description,
                priority,
            } => {
                let name = name.as_deref().or(element).unwrap_or_default();
                let mut strategy = LocatorStrategy::new(name, selector.as_str())
                    .with_priority(priority.unwrap_or(DEFAULT_PRIORITY));
                if let Some(description) = description {
                    strategy = strategy.with_description(description.as_str());
                }
                strategy
            }
        }
    }
}

/// Convert a step's strategy list
pub fn to_strategies(element: Option<&str>, specs: &[StrategySpec]) -> Vec<LocatorStrategy> {
    specs.iter().map(|spec| spec.to_strategy(element)).collect()
}

/// How to handle a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Stop the test at the failed step
    #[default]
    Abort,

    /// Record the failure and run the next step
    Continue,
}

/// Step execution result
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_id: String,

    pub action: &'static str,

    pub success: bool,

    /// Strategy that located the element, for click and fill
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_strategy: Option<LocatorStrategy>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn new(step_id: impl Into<String>, action: &'static str) -> Self {
        let now = Utc::now();
        Self {
            step_id: step_id.into(),
            action,
            success: false,
            used_strategy: None,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            error: None,
        }
    }

    pub fn with_success(mut self) -> Self {
        self.success = true;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Option<LocatorStrategy>) -> Self {
        self.used_strategy = strategy;
        self
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Cancelled,
    TimedOut,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Passed)
    }
}

/// Everything one test execution produced
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,

    pub test_id: String,

    pub test_name: String,

    pub status: ExecutionStatus,

    pub steps: Vec<StepResult>,

    /// Steps never started because an earlier step aborted the run
    pub skipped_steps: usize,

    pub healing_log: Vec<HealingAction>,

    pub metrics: HealingMetrics,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionSummary {
    pub fn passed(&self) -> bool {
        self.status.is_success()
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|step| !step.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::Locator;

    #[test]
    fn relative_urls_join_base() {
        let case = TestCase::new("t", "t").with_base_url("https://app.test/");
        assert_eq!(case.resolve_url("/login"), "https://app.test/login");
        assert_eq!(case.resolve_url("login"), "https://app.test/login");
        assert_eq!(
            case.resolve_url("https://other.test/x"),
            "https://other.test/x"
        );
        assert_eq!(case.resolve_url("about:blank"), "about:blank");

        let no_base = TestCase::new("t", "t");
        assert_eq!(no_base.resolve_url("/login"), "/login");
    }

    #[test]
    fn bare_and_detailed_strategies_convert() {
        let bare = StrategySpec::Selector("#login".into());
        let strategy = bare.to_strategy(Some("login-btn"));
        assert_eq!(strategy.name, "login-btn");
        assert_eq!(strategy.locator, Locator::selector("#login"));

        let detailed = StrategySpec::Detailed {
            name: Some("primary".into()),
            selector: "text=Log in".into(),
            description: Some("visible label".into()),
            priority: Some(1),
        };
        let strategy = detailed.to_strategy(Some("login-btn"));
        assert_eq!(strategy.name, "primary");
        assert_eq!(strategy.priority, 1);
        assert_eq!(strategy.description.as_deref(), Some("visible label"));
    }

    #[test]
    fn step_action_is_tagged_inline() {
        let step: TestStep = serde_json::from_value(serde_json::json!({
            "id": "login",
            "type": "click",
            "element": "login-btn",
            "strategies": ["#login", {"selector": "text=Log in"}]
        }))
        .unwrap();
        match &step.action {
            StepAction::Click {
                element,
                strategies,
            } => {
                assert_eq!(element.as_deref(), Some("login-btn"));
                assert_eq!(strategies.len(), 2);
                assert_eq!(strategies[1].selector(), "text=Log in");
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(step.on_failure, None);
    }

    #[test]
    fn wait_for_defaults_timeout() {
        let step: TestStep = serde_json::from_value(serde_json::json!({
            "id": "w",
            "type": "wait_for",
            "strategies": ["#ready"]
        }))
        .unwrap();
        assert!(matches!(
            step.action,
            StepAction::WaitFor { timeout_ms: 5_000, .. }
        ));
    }
}
