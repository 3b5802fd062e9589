//! `PageDriver` over a Chromium tab

use action_primitives::{
    poll_until, ActionError, ElementHandle, PageDriver, PollSchedule, SelectorExpr,
};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::errors::CdpError;
use crate::script::{
    extract_selector, marking_script, new_token, MarkResult, CLEAR_FN, COMMIT_FN, EDITABLE_FN,
    READ_VALUE_FN,
};

/// Function body reporting whether a click would reach an enabled element
const CLICKABLE_FN: &str = r#"function() {
    if (!this.isConnected) return false;
    if (this.disabled) return false;
    this.scrollIntoView({ block: 'center', inline: 'nearest' });
    return true;
}"#;

/// One browser tab driven over CDP.
///
/// Handles returned by [`PageDriver::wait_for`] carry the marker selector
/// written onto the element, so they stay valid until the element is
/// removed or the page navigates.
#[derive(Clone)]
pub struct CdpPage {
    page: Page,
    schedule: PollSchedule,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            schedule: PollSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Close the tab; clones of this page become unusable
    pub async fn close(self) -> Result<(), CdpError> {
        self.page.close().await?;
        debug!("Tab closed");
        Ok(())
    }

    /// One marking pass; `None` means "not there yet"
    async fn try_mark(&self, expr: &SelectorExpr) -> Option<Result<String, ActionError>> {
        let token = new_token(expr);
        let value = match self.page.evaluate(marking_script(expr, &token)).await {
            Ok(result) => result.value().cloned().unwrap_or(Value::Null),
            Err(err) => {
                // pages mid-navigation reject evaluation; keep polling
                trace!(error = %err, "Marking script failed");
                return None;
            }
        };
        match extract_selector(&value) {
            MarkResult::Marked(selector) => Some(Ok(selector)),
            MarkResult::NotFound => None,
            MarkResult::Invalid(message) => Some(Err(ActionError::InvalidSelector(message))),
        }
    }

    async fn element(&self, handle: &ElementHandle) -> Result<Element, ActionError> {
        self.page
            .find_element(handle.id.as_str())
            .await
            .map_err(|err| ActionError::AnchorNotFound(format!("{}: {}", handle.label(), err)))
    }

    async fn call_bool(
        &self,
        element: &Element,
        function: &str,
        handle: &ElementHandle,
    ) -> Result<bool, ActionError> {
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(|err| ActionError::CdpIo(format!("{}: {}", handle.label(), err)))?;
        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn current_url(&self) -> Result<String, ActionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| ActionError::CdpIo(err.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        debug!(url = %url, "Navigating");
        self.page
            .goto(url)
            .await
            .map_err(|err| ActionError::CdpIo(format!("navigation to {} failed: {}", url, err)))?;
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, ActionError> {
        let expr = SelectorExpr::parse(selector)?;
        match poll_until(timeout, self.schedule, || self.try_mark(&expr)).await {
            Some(Ok(marker)) => {
                debug!(selector = %selector, kind = expr.kind(), "Element resolved");
                Ok(ElementHandle::new(marker, Some(selector.to_string())))
            }
            Some(Err(err)) => Err(err),
            None => Err(ActionError::WaitTimeout(format!(
                "'{}' not visible within {}ms",
                selector,
                timeout.as_millis()
            ))),
        }
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let element = self.element(handle).await?;
        if !self.call_bool(&element, CLICKABLE_FN, handle).await? {
            return Err(ActionError::NotClickable(handle.label().to_string()));
        }
        element
            .click()
            .await
            .map_err(|err| ActionError::NotClickable(format!("{}: {}", handle.label(), err)))?;
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), ActionError> {
        let element = self.element(handle).await?;
        if !self.call_bool(&element, EDITABLE_FN, handle).await? {
            return Err(ActionError::NotEditable(handle.label().to_string()));
        }
        element
            .call_js_fn(CLEAR_FN, false)
            .await
            .map_err(|err| ActionError::CdpIo(format!("{}: {}", handle.label(), err)))?;
        element
            .type_str(value)
            .await
            .map_err(|err| ActionError::CdpIo(format!("{}: {}", handle.label(), err)))?;
        element
            .call_js_fn(COMMIT_FN, false)
            .await
            .map_err(|err| ActionError::CdpIo(format!("{}: {}", handle.label(), err)))?;
        Ok(())
    }

    async fn input_value(&self, handle: &ElementHandle) -> Result<String, ActionError> {
        let element = self.element(handle).await?;
        let returns = element
            .call_js_fn(READ_VALUE_FN, false)
            .await
            .map_err(|err| ActionError::CdpIo(format!("{}: {}", handle.label(), err)))?;
        Ok(match returns.result.value {
            Some(Value::String(text)) => text,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }
}
