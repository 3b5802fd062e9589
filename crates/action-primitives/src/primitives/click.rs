//! Click primitive

use async_trait::async_trait;
use tracing::debug;

use crate::{
    driver::PageDriver,
    errors::ActionError,
    primitives::VerifiedAction,
    types::{ActionKind, ElementHandle},
};

/// Click an element.
///
/// Clicks have no readable post-state, so verification is the click call
/// itself completing without error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickAction;

#[async_trait]
impl VerifiedAction for ClickAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Click
    }

    async fn act(
        &self,
        page: &dyn PageDriver,
        element: &ElementHandle,
    ) -> Result<(), ActionError> {
        debug!(element = %element, "Executing click");
        page.click(element).await
    }

    async fn verify(
        &self,
        _page: &dyn PageDriver,
        _element: &ElementHandle,
    ) -> Result<(), ActionError> {
        Ok(())
    }
}
