//! Page driver abstraction

use async_trait::async_trait;
use std::time::Duration;

use crate::{errors::ActionError, types::ElementHandle};

/// The page surface the healing engine needs from a browser-automation backend.
///
/// Selectors use the syntax parsed by [`crate::SelectorExpr`]. A page is owned
/// by one test execution; implementations do not need to support concurrent
/// actions on the same page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// URL of the document currently loaded
    async fn current_url(&self) -> Result<String, ActionError>;

    /// Navigate to a URL and wait for the document to load
    async fn navigate(&self, url: &str) -> Result<(), ActionError>;

    /// Wait until `selector` resolves to an element, up to `timeout`
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, ActionError>;

    /// Click a resolved element
    async fn click(&self, element: &ElementHandle) -> Result<(), ActionError>;

    /// Replace the value of an input element
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), ActionError>;

    /// Read the current value of an input element
    async fn input_value(&self, element: &ElementHandle) -> Result<String, ActionError>;
}
