//! Test runner behaviour on the in-memory page

use action_flow::{
    parse_case, CaseFormat, ExecutionStatus, FailureStrategy, FlowError, StepAction,
    StrategySpec, TestCase, TestRunner, TestStep,
};
use action_locator::ResolveOptions;
use action_primitives::{InMemoryPage, MemoryElement, PageDriver};
use healwright_core_types::ElementKey;
use selector_store::{MemorySelectorStore, SelectorStore, SharedSelectorStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast() -> ResolveOptions {
    ResolveOptions::default()
        .with_max_retries(0)
        .with_per_candidate_timeout(Duration::from_millis(100))
}

fn login_page() -> Arc<InMemoryPage> {
    Arc::new(
        InMemoryPage::new("about:blank")
            .with_element(MemoryElement::new("email").matching("#email"))
            .with_element(MemoryElement::new("login").matching("text=Log in")),
    )
}

fn click(id: &str, element: &str, selectors: &[&str]) -> TestStep {
    TestStep::new(
        id,
        StepAction::Click {
            element: Some(element.to_string()),
            strategies: selectors
                .iter()
                .map(|s| StrategySpec::Selector(s.to_string()))
                .collect(),
        },
    )
}

fn login_case() -> TestCase {
    TestCase::new("login", "Log in")
        .with_base_url("https://app.test")
        .with_step(TestStep::new(
            "open",
            StepAction::Navigate {
                url: "/login".into(),
            },
        ))
        .with_step(TestStep::new(
            "email",
            StepAction::Fill {
                element: Some("email-input".into()),
                strategies: vec![StrategySpec::Selector("#email".into())],
                value: "user@example.com".into(),
            },
        ))
        .with_step(click("submit", "login-btn", &["#login", "text=Log in"]))
}

#[tokio::test(start_paused = true)]
async fn passing_case_heals_and_persists() {
    let page = login_page();
    let store: SharedSelectorStore = Arc::new(MemorySelectorStore::new());
    let runner = TestRunner::new(Some(store.clone())).with_options(fast());

    let summary = runner
        .run(page.clone(), &login_case(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, ExecutionStatus::Passed);
    assert_eq!(summary.steps.len(), 3);
    assert_eq!(summary.skipped_steps, 0);
    assert_eq!(page.current_url().await.unwrap(), "https://app.test/login");
    assert_eq!(page.value_of("email").as_deref(), Some("user@example.com"));
    assert_eq!(page.click_count("login"), 1);

    // fill: one success; click: #login fails, text=Log in succeeds
    assert_eq!(summary.healing_log.len(), 3);
    assert_eq!(summary.metrics.successful_healing, 2);
    let used = summary.steps[2].used_strategy.as_ref().unwrap();
    assert_eq!(used.locator.as_selector(), Some("text=Log in"));

    let key = ElementKey::global("https://app.test/login", "login-btn").unwrap();
    let record = store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.locator, "text=Log in");
}

#[tokio::test(start_paused = true)]
async fn second_run_starts_from_healed_selector() {
    let store: SharedSelectorStore = Arc::new(MemorySelectorStore::new());
    let runner = TestRunner::new(Some(store)).with_options(fast());

    let first = runner
        .run(login_page(), &login_case(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.healing_log.len(), 3);

    let second = runner
        .run(login_page(), &login_case(), CancellationToken::new())
        .await
        .unwrap();
    assert!(second.passed());
    assert_eq!(second.healing_log.len(), 2);
    assert!(second.healing_log.iter().all(|entry| entry.success));
}

#[tokio::test(start_paused = true)]
async fn failed_step_aborts_by_default() {
    let case = TestCase::new("broken", "Broken")
        .with_step(click("missing", "gone", &["#gone"]))
        .with_step(click("never", "login-btn", &["text=Log in"]));

    let page = login_page();
    let summary = TestRunner::new(None)
        .with_options(fast())
        .run(page.clone(), &case, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, ExecutionStatus::Failed);
    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.skipped_steps, 1);
    assert!(summary.error.unwrap().contains("missing"));
    assert_eq!(page.click_count("login"), 0);
}

#[tokio::test(start_paused = true)]
async fn continue_strategy_runs_remaining_steps() {
    let case = TestCase::new("lenient", "Lenient")
        .with_failure_strategy(FailureStrategy::Continue)
        .with_step(click("missing", "gone", &["#gone"]))
        .with_step(click("submit", "login-btn", &["text=Log in"]));

    let page = login_page();
    let summary = TestRunner::new(None)
        .with_options(fast())
        .run(page.clone(), &case, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, ExecutionStatus::Failed);
    assert_eq!(summary.steps.len(), 2);
    assert!(!summary.steps[0].success);
    assert!(summary.steps[1].success);
    assert_eq!(summary.failed_steps().count(), 1);
    assert_eq!(page.click_count("login"), 1);
}

#[tokio::test(start_paused = true)]
async fn step_override_beats_case_strategy() {
    let case = TestCase::new("mixed", "Mixed")
        .with_failure_strategy(FailureStrategy::Continue)
        .with_step(click("missing", "gone", &["#gone"]).on_failure(FailureStrategy::Abort))
        .with_step(click("submit", "login-btn", &["text=Log in"]));

    let summary = TestRunner::new(None)
        .with_options(fast())
        .run(login_page(), &case, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.skipped_steps, 1);
}

#[tokio::test(start_paused = true)]
async fn url_assertion_checks_substring() {
    let case = TestCase::new("url", "URL")
        .with_failure_strategy(FailureStrategy::Continue)
        .with_step(TestStep::new(
            "go",
            StepAction::Navigate {
                url: "https://app.test/dashboard".into(),
            },
        ))
        .with_step(TestStep::new(
            "ok",
            StepAction::AssertUrl {
                contains: "/dashboard".into(),
            },
        ))
        .with_step(TestStep::new(
            "wrong",
            StepAction::AssertUrl {
                contains: "/settings".into(),
            },
        ));

    let summary = TestRunner::new(None)
        .run(login_page(), &case, CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.steps[1].success);
    assert!(!summary.steps[2].success);
    assert!(summary.steps[2]
        .error
        .as_deref()
        .unwrap()
        .contains("/settings"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_sees_late_element() {
    let page = Arc::new(
        InMemoryPage::new("https://app.test").with_element(
            MemoryElement::new("banner")
                .matching("#banner")
                .appears_after(Duration::from_millis(300)),
        ),
    );
    let case = TestCase::new("wait", "Wait")
        .with_failure_strategy(FailureStrategy::Continue)
        .with_step(TestStep::new(
            "banner",
            StepAction::WaitFor {
                element: None,
                strategies: vec![
                    StrategySpec::Selector("#missing".into()),
                    StrategySpec::Selector("#banner".into()),
                ],
                timeout_ms: 1_000,
            },
        ))
        .with_step(TestStep::new(
            "never",
            StepAction::WaitFor {
                element: None,
                strategies: vec![StrategySpec::Selector("#never".into())],
                timeout_ms: 200,
            },
        ));

    let summary = TestRunner::new(None)
        .run(page, &case, CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.steps[0].success);
    assert!(!summary.steps[1].success);
    // waits are not healing attempts
    assert!(summary.healing_log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn overall_timeout_reports_timed_out() {
    let case = TestCase::new("slow", "Slow").with_step(click("missing", "gone", &["#gone"]));

    let summary = TestRunner::new(None)
        .with_timeout(Some(Duration::from_millis(300)))
        .run(login_page(), &case, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, ExecutionStatus::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_stops_before_first_step() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let page = login_page();

    let summary = TestRunner::new(None)
        .run(page.clone(), &login_case(), cancel)
        .await
        .unwrap();

    assert_eq!(summary.status, ExecutionStatus::Cancelled);
    assert!(summary.steps.is_empty());
    assert_eq!(summary.skipped_steps, 3);
    assert_eq!(page.navigations(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_case_is_rejected() {
    let err = TestRunner::new(None)
        .run(login_page(), &TestCase::new("empty", "Empty"), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::ValidationFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn yaml_case_runs_end_to_end() {
    let yaml = r##"
id: yaml-login
name: YAML login
base_url: https://app.test
steps:
  - id: open
    type: navigate
    url: /login
  - id: submit
    type: click
    element: login-btn
    strategies: ["text=Log in"]
  - id: check
    type: assert_url
    contains: app.test
"##;
    let case = parse_case(yaml, CaseFormat::Yaml, "inline").unwrap();
    let summary = TestRunner::new(None)
        .run(login_page(), &case, CancellationToken::new())
        .await
        .unwrap();
    assert!(summary.passed());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["status"], "passed");
    assert_eq!(json["healing_log"][0]["type"], "click");
    assert_eq!(json["metrics"]["totalAttempts"], 1);
}
