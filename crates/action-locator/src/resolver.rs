//! Locator resolution engine
//!
//! Walks an ordered candidate sequence in rounds. Within a round each candidate
//! is waited for, acted on and verified; the first candidate to pass wins.
//! A round where every candidate failed is followed by a fixed backoff and a
//! full re-scan from the first candidate, up to `max_retries` extra rounds.

use action_primitives::{
    bounded, cancellable_sleep, wait_for_element, ActionError, ElementHandle, ExecCtx, PageDriver,
    VerifiedAction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    errors::LocatorError,
    healing_log::{HealingAction, HealingLog},
    types::{Candidate, Locator, ResolveOptions, Resolution},
};

/// Stateless driver of the candidate/round loop
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionEngine;

enum Attempt {
    Passed,
    Failed(ActionError),
}

impl ResolutionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `candidates` against `page` for `action`.
    ///
    /// Every attempt is appended to `log` before the next one starts. Returns
    /// `Ok` with `used = None` when every candidate failed in every round;
    /// returns `Err` only when `ctx` is cancelled or its deadline passes.
    pub async fn resolve(
        &self,
        page: &Arc<dyn PageDriver>,
        candidates: &[Candidate],
        action: &dyn VerifiedAction,
        options: &ResolveOptions,
        log: &HealingLog,
        ctx: &ExecCtx,
    ) -> Result<Resolution, LocatorError> {
        let mut attempts = 0usize;
        let mut rounds = 0u32;

        if candidates.is_empty() {
            return Ok(Resolution {
                used: None,
                attempts,
                rounds,
            });
        }

        for round in 0..=options.max_retries {
            rounds = round + 1;
            if round > 0 {
                debug!(
                    action_id = %ctx.action_id,
                    round,
                    backoff_ms = options.retry_backoff.as_millis() as u64,
                    "All candidates failed, backing off before re-scan"
                );
                self.backoff(options.retry_backoff, ctx).await?;
            }

            for candidate in candidates {
                self.check_deadline(ctx)?;
                attempts += 1;

                let outcome = self
                    .attempt(page, candidate, action, options.per_candidate_timeout, ctx)
                    .await;

                match outcome {
                    Attempt::Passed => {
                        log.append(HealingAction::attempt(
                            action.kind(),
                            candidate,
                            round,
                            action.value(),
                            None,
                        ));
                        info!(
                            action_id = %ctx.action_id,
                            action = %action.kind(),
                            strategy = %candidate.strategy_name(),
                            locator = %candidate.locator().describe(),
                            round,
                            attempts,
                            "Candidate passed verification"
                        );
                        return Ok(Resolution {
                            used: Some(candidate.clone()),
                            attempts,
                            rounds,
                        });
                    }
                    Attempt::Failed(err) => {
                        log.append(HealingAction::attempt(
                            action.kind(),
                            candidate,
                            round,
                            action.value(),
                            Some(err.to_string()),
                        ));
                        // only the execution itself stopping ends the loop
                        if ctx.is_cancelled() || ctx.is_timeout() {
                            warn!(action_id = %ctx.action_id, "Resolution cancelled");
                            return Err(self.stop_reason(ctx, err));
                        }
                        debug!(
                            action_id = %ctx.action_id,
                            strategy = %candidate.strategy_name(),
                            locator = %candidate.locator().describe(),
                            round,
                            error = %err,
                            "Candidate failed"
                        );
                    }
                }
            }
        }

        info!(
            action_id = %ctx.action_id,
            action = %action.kind(),
            attempts,
            rounds,
            "Candidates exhausted"
        );
        Ok(Resolution {
            used: None,
            attempts,
            rounds,
        })
    }

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        candidate: &Candidate,
        action: &dyn VerifiedAction,
        timeout: Duration,
        ctx: &ExecCtx,
    ) -> Attempt {
        let limit = ctx
            .remaining_time()
            .map_or(timeout, |remaining| remaining.min(timeout));

        let element: Result<ElementHandle, ActionError> = match candidate.locator() {
            Locator::Selector(selector) => {
                wait_for_element(page.as_ref(), selector, limit, &ctx.cancel_token).await
            }
            Locator::Derived(derived) => {
                bounded(
                    derived.label(),
                    limit,
                    &ctx.cancel_token,
                    derived.derive(Arc::clone(page)),
                )
                .await
            }
        };

        let element = match element {
            Ok(element) => element,
            Err(err) => return Attempt::Failed(err),
        };

        match action.perform(page.as_ref(), &element).await {
            Ok(()) => Attempt::Passed,
            Err(err) => Attempt::Failed(err),
        }
    }

    async fn backoff(&self, duration: Duration, ctx: &ExecCtx) -> Result<(), LocatorError> {
        self.check_deadline(ctx)?;
        let duration = ctx
            .remaining_time()
            .map_or(duration, |remaining| remaining.min(duration));
        cancellable_sleep(duration, &ctx.cancel_token)
            .await
            .map_err(|err| self.stop_reason(ctx, err))
    }

    fn check_deadline(&self, ctx: &ExecCtx) -> Result<(), LocatorError> {
        if ctx.is_cancelled() {
            return Err(LocatorError::Cancelled(format!(
                "action {} stopped",
                ctx.action_id
            )));
        }
        if ctx.is_timeout() {
            return Err(LocatorError::DeadlineExceeded(format!(
                "action {} ran past its deadline",
                ctx.action_id
            )));
        }
        Ok(())
    }

    fn stop_reason(&self, ctx: &ExecCtx, err: ActionError) -> LocatorError {
        if ctx.is_timeout() && !ctx.is_cancelled() {
            LocatorError::DeadlineExceeded(err.to_string())
        } else {
            LocatorError::Cancelled(err.to_string())
        }
    }
}
