//! Cancellable waiting helpers

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{driver::PageDriver, errors::ActionError, types::ElementHandle};

/// Polling cadence for element lookups: starts at `initial`, doubles each
/// miss, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(1),
        }
    }
}

/// Probe repeatedly until it yields a value or `limit` elapses.
///
/// The probe always runs at least once, and once more at the deadline.
pub async fn poll_until<T, F, Fut>(limit: Duration, schedule: PollSchedule, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + limit;
    let mut interval = schedule.initial;

    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        sleep(interval.min(deadline - now)).await;
        interval = (interval * 2).min(schedule.max);
    }
}

/// Wait for `selector` on `page`, aborting early if `cancel` fires.
pub async fn wait_for_element(
    page: &dyn PageDriver,
    selector: &str,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<ElementHandle, ActionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(selector = %selector, "element wait cancelled");
            Err(ActionError::Interrupted(format!("wait for '{}' cancelled", selector)))
        }
        result = page.wait_for(selector, limit) => result,
    }
}

/// Run an arbitrary element-producing future under a timeout and cancellation.
pub async fn bounded<T, Fut>(
    label: &str,
    limit: Duration,
    cancel: &CancellationToken,
    fut: Fut,
) -> Result<T, ActionError>
where
    Fut: Future<Output = Result<T, ActionError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ActionError::Interrupted(format!("{} cancelled", label))),
        result = timeout(limit, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(ActionError::WaitTimeout(format!(
                "{} did not resolve within {}ms",
                label,
                limit.as_millis()
            ))),
        },
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn cancellable_sleep(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), ActionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ActionError::Interrupted("backoff cancelled".to_string())),
        _ = sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn poll_until_backs_off_and_gives_up() {
        let probes = AtomicUsize::new(0);
        let started = Instant::now();
        let result: Option<()> = poll_until(
            Duration::from_millis(1000),
            PollSchedule::default(),
            || {
                probes.fetch_add(1, Ordering::SeqCst);
                std::future::ready(None)
            },
        )
        .await;

        assert!(result.is_none());
        // probes at 0, 100, 300, 700 and the deadline (1000)
        assert_eq!(probes.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_returns_first_hit() {
        let probes = AtomicUsize::new(0);
        let result = poll_until(Duration::from_secs(5), PollSchedule::default(), || {
            let n = probes.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n == 2 { Some(n) } else { None })
        })
        .await;
        assert_eq!(result, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_sleep_is_interrupted() {
        let token = CancellationToken::new();
        token.cancel();
        let err = cancellable_sleep(Duration::from_secs(10), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let token = CancellationToken::new();
        let err = bounded("derived locator", Duration::from_millis(100), &token, async {
            sleep(Duration::from_secs(1)).await;
            Ok::<_, ActionError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::WaitTimeout(_)));
    }
}
