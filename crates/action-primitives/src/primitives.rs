//! Verified action primitives
//!
//! Two primitives go through healing resolution:
//! 1. click - succeeds when the click call completes
//! 2. fill - succeeds when the field reads back the exact value written

mod click;
mod fill;

pub use click::*;
pub use fill::*;

use async_trait::async_trait;

use crate::{
    driver::PageDriver,
    errors::ActionError,
    types::{ActionKind, ElementHandle},
};

/// An action paired with its post-condition check.
///
/// The locator engine runs `act` then `verify` against each candidate element;
/// either returning an error marks that candidate as failed.
#[async_trait]
pub trait VerifiedAction: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Value written by the action, if it writes one
    fn value(&self) -> Option<&str> {
        None
    }

    async fn act(&self, page: &dyn PageDriver, element: &ElementHandle)
        -> Result<(), ActionError>;

    async fn verify(
        &self,
        page: &dyn PageDriver,
        element: &ElementHandle,
    ) -> Result<(), ActionError>;

    /// Act, then verify
    async fn perform(
        &self,
        page: &dyn PageDriver,
        element: &ElementHandle,
    ) -> Result<(), ActionError> {
        self.act(page, element).await?;
        self.verify(page, element).await
    }
}
