//! Sequential test execution

use action_locator::{ActionOutcome, HealingLog, IntelligentActions, LocatorError, ResolveOptions};
use action_primitives::{poll_until, ActionError, ExecCtx, PageDriver, PollSchedule};
use chrono::Utc;
use healwright_core_types::{ExecutionId, SuiteId};
use selector_store::SharedSelectorStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::FlowError,
    loader::validate_case,
    types::{
        to_strategies, ExecutionStatus, ExecutionSummary, FailureStrategy, StepAction,
        StepResult, TestCase, TestStep,
    },
};

/// Why a run stopped before its last step
enum Halt {
    Aborted(String),
    Cancelled(String),
    DeadlineExceeded(String),
}

/// Runs test cases step by step against a page
#[derive(Clone, Default)]
pub struct TestRunner {
    store: Option<SharedSelectorStore>,
    options: ResolveOptions,
    timeout: Option<Duration>,
}

impl TestRunner {
    pub fn new(store: Option<SharedSelectorStore>) -> Self {
        Self {
            store,
            options: ResolveOptions::default(),
            timeout: None,
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Bound the whole execution
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Execute `test` on `page`.
    ///
    /// Only an invalid test case is an error; failed steps, cancellation and
    /// timeouts are reported through the summary status.
    pub async fn run(
        &self,
        page: Arc<dyn PageDriver>,
        test: &TestCase,
        cancel: CancellationToken,
    ) -> Result<ExecutionSummary, FlowError> {
        validate_case(test)?;

        let execution_id = ExecutionId::new();
        let started_at = Utc::now();
        info!(execution_id = %execution_id, test = %test.id, steps = test.steps.len(), "Starting test");

        let mut ctx = ExecCtx::new(cancel.child_token());
        if let Some(limit) = self.timeout {
            ctx = ctx.with_timeout(limit);
        }
        let log = Arc::new(HealingLog::new());
        let actions = IntelligentActions::new(page, self.store.clone())
            .with_suite(test.suite_id.as_deref().map(SuiteId::new))
            .with_context(ctx.clone())
            .with_log(log.clone());

        let mut results = Vec::with_capacity(test.steps.len());
        let halt = match self.timeout {
            Some(limit) => {
                match timeout(limit, self.run_steps(&actions, test, &mut results)).await {
                    Ok(halt) => halt,
                    Err(_) => Some(Halt::DeadlineExceeded(format!(
                        "test exceeded {}ms",
                        limit.as_millis()
                    ))),
                }
            }
            None => self.run_steps(&actions, test, &mut results).await,
        };

        // write-backs started by successful steps land even when the run failed
        actions.flush().await;

        let (status, error) = match halt {
            None if results.iter().all(|step| step.success) => (ExecutionStatus::Passed, None),
            None => (
                ExecutionStatus::Failed,
                Some("one or more steps failed".to_string()),
            ),
            Some(Halt::Aborted(reason)) => (ExecutionStatus::Failed, Some(reason)),
            Some(Halt::Cancelled(reason)) => (ExecutionStatus::Cancelled, Some(reason)),
            Some(Halt::DeadlineExceeded(reason)) => (ExecutionStatus::TimedOut, Some(reason)),
        };

        let finished_at = Utc::now();
        let summary = ExecutionSummary {
            execution_id,
            test_id: test.id.clone(),
            test_name: test.name.clone(),
            status,
            skipped_steps: test.steps.len().saturating_sub(results.len()),
            steps: results,
            healing_log: log.snapshot(),
            metrics: log.metrics(),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            error,
        };

        match summary.status {
            ExecutionStatus::Passed => info!(
                execution_id = %summary.execution_id,
                test = %summary.test_id,
                attempts = summary.metrics.total_attempts,
                "Test passed"
            ),
            status => warn!(
                execution_id = %summary.execution_id,
                test = %summary.test_id,
                status = ?status,
                error = summary.error.as_deref().unwrap_or_default(),
                "Test did not pass"
            ),
        }
        Ok(summary)
    }

    async fn run_steps(
        &self,
        actions: &IntelligentActions,
        test: &TestCase,
        results: &mut Vec<StepResult>,
    ) -> Option<Halt> {
        for (index, step) in test.steps.iter().enumerate() {
            if actions.context().is_cancelled() {
                return Some(Halt::Cancelled(format!("cancelled before step {}", step.id)));
            }

            debug!(step = %step.id, index, action = step.action.name(), "Running step");
            let (result, interrupt) = self.run_step(actions, test, step).await;
            let failed = !result.success;
            let reason = result.error.clone().unwrap_or_default();
            results.push(result);

            if let Some(halt) = interrupt {
                return Some(halt);
            }
            if failed {
                let strategy = step.on_failure.unwrap_or(test.failure_strategy);
                match strategy {
                    FailureStrategy::Abort => {
                        warn!(step = %step.id, error = %reason, "Step failed, aborting test");
                        return Some(Halt::Aborted(format!("step {} failed: {}", step.id, reason)));
                    }
                    FailureStrategy::Continue => {
                        warn!(step = %step.id, error = %reason, "Step failed, continuing");
                    }
                }
            }
        }
        None
    }

    async fn run_step(
        &self,
        actions: &IntelligentActions,
        test: &TestCase,
        step: &TestStep,
    ) -> (StepResult, Option<Halt>) {
        let result = StepResult::new(step.id.as_str(), step.action.name());

        match &step.action {
            StepAction::Navigate { url } => {
                let target = test.resolve_url(url);
                match actions.page().navigate(&target).await {
                    Ok(()) => (result.with_success().finish(), None),
                    Err(err) => (result.with_error(err.to_string()).finish(), None),
                }
            }

            StepAction::Click {
                element,
                strategies,
            } => {
                let strategies = to_strategies(element.as_deref(), strategies);
                let outcome = actions.intelligent_click(&strategies, &self.options).await;
                healing_result(result, outcome)
            }

            StepAction::Fill {
                element,
                strategies,
                value,
            } => {
                let strategies = to_strategies(element.as_deref(), strategies);
                let outcome = actions
                    .intelligent_fill(&strategies, value, &self.options)
                    .await;
                healing_result(result, outcome)
            }

            StepAction::WaitFor {
                element,
                strategies,
                timeout_ms,
            } => {
                let selectors: Vec<String> = strategies
                    .iter()
                    .map(|spec| spec.selector().to_string())
                    .filter(|selector| !selector.trim().is_empty())
                    .collect();
                let label = element.as_deref().unwrap_or(step.id.as_str());
                match wait_for_any(
                    actions.page().as_ref(),
                    &selectors,
                    Duration::from_millis(*timeout_ms),
                    actions.context(),
                )
                .await
                {
                    Ok(selector) => {
                        debug!(element = %label, selector = %selector, "Element present");
                        (result.with_success().finish(), None)
                    }
                    Err(err) if err.is_cancellation() => {
                        let reason = err.to_string();
                        (
                            result.with_error(reason.clone()).finish(),
                            Some(Halt::Cancelled(reason)),
                        )
                    }
                    Err(err) => (result.with_error(err.to_string()).finish(), None),
                }
            }

            StepAction::AssertUrl { contains } => match actions.page().current_url().await {
                Ok(url) if url.contains(contains.as_str()) => (result.with_success().finish(), None),
                Ok(url) => (
                    result
                        .with_error(format!("URL {} does not contain {}", url, contains))
                        .finish(),
                    None,
                ),
                Err(err) => (result.with_error(err.to_string()).finish(), None),
            },
        }
    }
}

fn healing_result(
    result: StepResult,
    outcome: Result<ActionOutcome, LocatorError>,
) -> (StepResult, Option<Halt>) {
    match outcome {
        Ok(outcome) if outcome.success => (
            result
                .with_strategy(outcome.used_strategy)
                .with_success()
                .finish(),
            None,
        ),
        Ok(_) => (
            result
                .with_error("no strategy located and verified the element")
                .finish(),
            None,
        ),
        Err(err) => {
            let reason = err.to_string();
            let halt = match err {
                LocatorError::DeadlineExceeded(_) => Halt::DeadlineExceeded(reason.clone()),
                _ => Halt::Cancelled(reason.clone()),
            };
            (result.with_error(reason).finish(), Some(halt))
        }
    }
}

/// Wait until any of `selectors` resolves, returning the first that does
async fn wait_for_any(
    page: &dyn PageDriver,
    selectors: &[String],
    limit: Duration,
    ctx: &ExecCtx,
) -> Result<String, ActionError> {
    if selectors.is_empty() {
        return Err(ActionError::InvalidSelector("no selectors to wait for".to_string()));
    }
    let limit = ctx
        .remaining_time()
        .map(|remaining| remaining.min(limit))
        .unwrap_or(limit);

    let probe = move || async move {
        for selector in selectors {
            if page.wait_for(selector, Duration::ZERO).await.is_ok() {
                return Some(selector.clone());
            }
        }
        None
    };

    tokio::select! {
        biased;
        _ = ctx.cancel_token.cancelled() => {
            Err(ActionError::Interrupted("wait cancelled".to_string()))
        }
        found = poll_until(limit, PollSchedule::default(), probe) => {
            found.ok_or_else(|| ActionError::WaitTimeout(format!(
                "none of {:?} appeared within {}ms",
                selectors,
                limit.as_millis()
            )))
        }
    }
}
