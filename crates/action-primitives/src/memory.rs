//! Scripted in-memory page
//!
//! `InMemoryPage` models a page as a list of elements, each answering to an
//! explicit set of selectors. It supports read-only fields that silently
//! ignore fills, disabled elements, elements that appear after a delay and
//! elements removed mid-run, which is enough to exercise every healing path
//! without a browser.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    driver::PageDriver,
    errors::ActionError,
    types::ElementHandle,
    waiting::{poll_until, PollSchedule},
};

/// Element definition for [`InMemoryPage`]
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    pub id: String,
    pub selectors: Vec<String>,
    pub value: String,
    pub readonly: bool,
    pub disabled: bool,
    pub appears_after: Option<Duration>,
}

impl MemoryElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a selector this element answers to (exact text match)
    pub fn matching(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Fills are accepted without error but do not change the value
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Clicks and fills are rejected
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Element only becomes resolvable once `delay` has passed since page creation
    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }
}

#[derive(Debug)]
struct ElementState {
    spec: MemoryElement,
    clicks: u32,
}

#[derive(Debug, Default)]
struct PageStats {
    waits: AtomicUsize,
    clicks: AtomicUsize,
    fills: AtomicUsize,
    navigations: AtomicUsize,
}

#[derive(Debug)]
pub struct InMemoryPage {
    url: RwLock<String>,
    elements: RwLock<Vec<ElementState>>,
    created_at: Instant,
    schedule: PollSchedule,
    stats: PageStats,
}

impl InMemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(url.into()),
            elements: RwLock::new(Vec::new()),
            created_at: Instant::now(),
            schedule: PollSchedule::default(),
            stats: PageStats::default(),
        }
    }

    pub fn with_element(self, element: MemoryElement) -> Self {
        self.add_element(element);
        self
    }

    pub fn add_element(&self, element: MemoryElement) {
        self.elements.write().push(ElementState {
            spec: element,
            clicks: 0,
        });
    }

    /// Remove an element, as if the page re-rendered without it
    pub fn remove_element(&self, id: &str) -> bool {
        let mut elements = self.elements.write();
        let before = elements.len();
        elements.retain(|state| state.spec.id != id);
        elements.len() != before
    }

    pub fn value_of(&self, id: &str) -> Option<String> {
        self.elements
            .read()
            .iter()
            .find(|state| state.spec.id == id)
            .map(|state| state.spec.value.clone())
    }

    pub fn click_count(&self, id: &str) -> u32 {
        self.elements
            .read()
            .iter()
            .find(|state| state.spec.id == id)
            .map(|state| state.clicks)
            .unwrap_or(0)
    }

    /// Number of `wait_for` calls made against this page
    pub fn wait_calls(&self) -> usize {
        self.stats.waits.load(Ordering::Relaxed)
    }

    /// Number of click calls that reached an element
    pub fn click_calls(&self) -> usize {
        self.stats.clicks.load(Ordering::Relaxed)
    }

    /// Number of fill calls that reached an element
    pub fn fill_calls(&self) -> usize {
        self.stats.fills.load(Ordering::Relaxed)
    }

    pub fn navigations(&self) -> usize {
        self.stats.navigations.load(Ordering::Relaxed)
    }

    fn lookup(&self, selector: &str) -> Option<ElementHandle> {
        let elapsed = self.created_at.elapsed();
        self.elements
            .read()
            .iter()
            .find(|state| {
                state.spec.selectors.iter().any(|s| s == selector)
                    && state
                        .spec
                        .appears_after
                        .map(|delay| elapsed >= delay)
                        .unwrap_or(true)
            })
            .map(|state| ElementHandle::new(state.spec.id.clone(), Some(selector.to_string())))
    }

    fn with_element_mut<T>(
        &self,
        handle: &ElementHandle,
        apply: impl FnOnce(&mut ElementState) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        let mut elements = self.elements.write();
        let state = elements
            .iter_mut()
            .find(|state| state.spec.id == handle.id)
            .ok_or_else(|| {
                ActionError::AnchorNotFound(format!("element '{}' is detached", handle.label()))
            })?;
        apply(state)
    }
}

#[async_trait]
impl PageDriver for InMemoryPage {
    async fn current_url(&self) -> Result<String, ActionError> {
        Ok(self.url.read().clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        self.stats.navigations.fetch_add(1, Ordering::Relaxed);
        *self.url.write() = url.to_string();
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, ActionError> {
        self.stats.waits.fetch_add(1, Ordering::Relaxed);
        if selector.trim().is_empty() {
            return Err(ActionError::InvalidSelector("empty selector".to_string()));
        }

        let found = poll_until(timeout, self.schedule, || {
            std::future::ready(self.lookup(selector))
        })
        .await;

        found.ok_or_else(|| {
            debug!(selector = %selector, "in-memory element not found");
            ActionError::WaitTimeout(format!(
                "'{}' not found within {}ms",
                selector,
                timeout.as_millis()
            ))
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.with_element_mut(element, |state| {
            if state.spec.disabled {
                return Err(ActionError::NotClickable(format!(
                    "'{}' is disabled",
                    element.label()
                )));
            }
            state.clicks += 1;
            Ok(())
        })?;
        self.stats.clicks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), ActionError> {
        self.with_element_mut(element, |state| {
            if state.spec.disabled {
                return Err(ActionError::NotEditable(format!(
                    "'{}' is disabled",
                    element.label()
                )));
            }
            if !state.spec.readonly {
                state.spec.value = value.to_string();
            }
            Ok(())
        })?;
        self.stats.fills.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String, ActionError> {
        self.with_element_mut(element, |state| Ok(state.spec.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> InMemoryPage {
        InMemoryPage::new("https://app.test/login")
            .with_element(MemoryElement::new("login").matching("#new-login"))
            .with_element(MemoryElement::new("legacy").matching("#legacy").disabled())
    }

    #[tokio::test(start_paused = true)]
    async fn missing_selector_times_out() {
        let page = login_page();
        let err = page
            .wait_for("#old-login", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::WaitTimeout(_)));
        assert_eq!(page.wait_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_element_resolves_once_visible() {
        let page = InMemoryPage::new("https://app.test").with_element(
            MemoryElement::new("toast")
                .matching(".toast")
                .appears_after(Duration::from_millis(250)),
        );
        let handle = page
            .wait_for(".toast", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(handle.id, "toast");
    }

    #[tokio::test]
    async fn disabled_element_rejects_click() {
        let page = login_page();
        let handle = page.wait_for("#legacy", Duration::ZERO).await.unwrap();
        assert!(matches!(
            page.click(&handle).await,
            Err(ActionError::NotClickable(_))
        ));
        assert_eq!(page.click_calls(), 0);
    }

    #[tokio::test]
    async fn removed_element_is_detached() {
        let page = login_page();
        let handle = page.wait_for("#new-login", Duration::ZERO).await.unwrap();
        assert!(page.remove_element("login"));
        assert!(matches!(
            page.click(&handle).await,
            Err(ActionError::AnchorNotFound(_))
        ));
    }

    #[tokio::test]
    async fn navigation_updates_url() {
        let page = login_page();
        page.navigate("https://app.test/home").await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://app.test/home");
        assert_eq!(page.navigations(), 1);
    }
}
