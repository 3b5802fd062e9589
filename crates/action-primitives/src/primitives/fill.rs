//! Fill primitive - write a value into an input and read it back

use async_trait::async_trait;
use tracing::debug;

use crate::{
    driver::PageDriver,
    errors::ActionError,
    primitives::VerifiedAction,
    types::{ActionKind, ElementHandle},
};

/// Fill an input with `value`.
///
/// Verification reads the field back and requires exact string equality, so
/// a selector that matched a read-only or decoy field fails even though the
/// fill call itself did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillAction {
    value: String,
}

impl FillAction {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[async_trait]
impl VerifiedAction for FillAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Fill
    }

    fn value(&self) -> Option<&str> {
        Some(&self.value)
    }

    async fn act(
        &self,
        page: &dyn PageDriver,
        element: &ElementHandle,
    ) -> Result<(), ActionError> {
        debug!(element = %element, text_length = self.value.len(), "Executing fill");
        page.fill(element, &self.value).await
    }

    async fn verify(
        &self,
        page: &dyn PageDriver,
        element: &ElementHandle,
    ) -> Result<(), ActionError> {
        let actual = page.input_value(element).await?;
        if actual != self.value {
            return Err(ActionError::VerificationMismatch {
                target: element.label().to_string(),
                expected: self.value.clone(),
                actual,
            });
        }
        Ok(())
    }
}
