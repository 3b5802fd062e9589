//! Intelligent click and fill
//!
//! Each call builds candidates from the selector store and the authored
//! strategies, resolves them, and on success writes the winning selector back
//! to the store on a background task.

use action_primitives::{ActionKind, ClickAction, ExecCtx, FillAction, PageDriver, VerifiedAction};
use healwright_core_types::{ElementKey, SuiteId};
use parking_lot::Mutex;
use selector_store::SharedSelectorStore;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    candidates::{CandidateBuilder, CandidatePlan},
    errors::LocatorError,
    healing_log::{HealingLog, SharedHealingLog},
    resolver::ResolutionEngine,
    types::{ActionOutcome, Candidate, LocatorStrategy, ResolveOptions},
};

/// Healing click/fill bound to one page and one execution
pub struct IntelligentActions {
    page: Arc<dyn PageDriver>,
    store: Option<SharedSelectorStore>,
    builder: CandidateBuilder,
    engine: ResolutionEngine,
    log: SharedHealingLog,
    suite: Option<SuiteId>,
    ctx: ExecCtx,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl IntelligentActions {
    pub fn new(page: Arc<dyn PageDriver>, store: Option<SharedSelectorStore>) -> Self {
        Self {
            page,
            builder: CandidateBuilder::new(store.clone()),
            store,
            engine: ResolutionEngine::new(),
            log: Arc::new(HealingLog::new()),
            suite: None,
            ctx: ExecCtx::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Scope store lookups and write-backs to a suite
    pub fn with_suite(mut self, suite: Option<SuiteId>) -> Self {
        self.suite = suite;
        self
    }

    /// Share cancellation and deadline with the enclosing execution
    pub fn with_context(mut self, ctx: ExecCtx) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_log(mut self, log: SharedHealingLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &SharedHealingLog {
        &self.log
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    pub fn context(&self) -> &ExecCtx {
        &self.ctx
    }

    /// Click the element described by `strategies`
    pub async fn intelligent_click(
        &self,
        strategies: &[LocatorStrategy],
        options: &ResolveOptions,
    ) -> Result<ActionOutcome, LocatorError> {
        self.run(strategies, &ClickAction, options).await
    }

    /// Fill the element described by `strategies` with `value`, verifying the
    /// field reads back exactly `value`
    pub async fn intelligent_fill(
        &self,
        strategies: &[LocatorStrategy],
        value: &str,
        options: &ResolveOptions,
    ) -> Result<ActionOutcome, LocatorError> {
        self.run(strategies, &FillAction::new(value), options).await
    }

    /// Wait for every write-back started so far
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return;
        }
        debug!(count = pending.len(), "Flushing selector write-backs");
        for handle in pending {
            if let Err(err) = handle.await {
                warn!(error = %err, "Selector write-back task failed");
            }
        }
    }

    async fn run(
        &self,
        strategies: &[LocatorStrategy],
        action: &dyn VerifiedAction,
        options: &ResolveOptions,
    ) -> Result<ActionOutcome, LocatorError> {
        let Some(first) = strategies.first() else {
            info!(action = %action.kind(), "No strategies supplied");
            return Ok(ActionOutcome::failed());
        };

        let ctx = self.ctx.child();
        let key = self.element_key(&first.name).await;
        let plan = self.builder.build(key.as_ref(), strategies).await;
        if plan.is_empty() {
            info!(action = %action.kind(), element = %first.display_name(), "No usable candidates");
            return Ok(ActionOutcome::failed());
        }

        info!(
            action_id = %ctx.action_id,
            action = %action.kind(),
            element = %first.display_name(),
            candidates = ?plan.describe(),
            "Resolving element"
        );

        let resolution = self
            .engine
            .resolve(
                &self.page,
                &plan.candidates,
                action,
                options,
                &self.log,
                &ctx,
            )
            .await?;

        match resolution.used {
            Some(winner) => {
                if let Some(key) = key {
                    self.write_back(key, &winner, &plan, action.kind());
                }
                Ok(ActionOutcome::succeeded(winner.strategy))
            }
            None => Ok(ActionOutcome::failed()),
        }
    }

    /// Key for the store, or `None` when lookups are impossible
    async fn element_key(&self, name: &str) -> Option<ElementKey> {
        self.store.as_ref()?;
        let url = match self.page.current_url().await {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "Could not read page URL, skipping selector history");
                return None;
            }
        };
        match ElementKey::new(self.suite.clone(), url, name) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(error = %err, "Strategy has no element name, skipping selector history");
                None
            }
        }
    }

    fn write_back(&self, key: ElementKey, winner: &Candidate, plan: &CandidatePlan, kind: ActionKind) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let Some(locator) = winner.locator().as_selector().map(str::to_string) else {
            debug!(key = %key, "Derived locator won, nothing to persist");
            return;
        };
        if plan
            .persisted
            .as_ref()
            .is_some_and(|record| record.is_front(&locator))
        {
            debug!(key = %key, locator = %locator, "Winning selector already first, skipping write-back");
            return;
        }

        let metadata = json!({
            "strategyName": winner.strategy_name(),
            "source": winner.source,
            "action": kind,
        });
        let handle = tokio::spawn(async move {
            match store.upsert(&key, &locator, Some(metadata)).await {
                Ok(record) => info!(
                    key = %key,
                    locator = %locator,
                    known = record.selectors.len(),
                    "Persisted healed selector"
                ),
                Err(err) => warn!(key = %key, locator = %locator, error = %err, "Selector write-back failed"),
            }
        });
        let mut pending = self.pending.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(handle);
    }
}
