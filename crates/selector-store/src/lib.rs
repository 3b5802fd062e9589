//! Selector persistence
//!
//! Remembers which locator last worked for each `(suite or "global", url,
//! element name)` triple. Every successful heal promotes the working locator to
//! the front of the record's history; nothing is ever dropped, so selectors
//! that stop working sink to low-priority fallbacks instead of disappearing.

pub mod errors;
pub mod memory;
pub mod model;
pub mod sqlite;

pub use errors::*;
pub use memory::MemorySelectorStore;
pub use model::*;
pub use sqlite::SqliteSelectorStore;

use async_trait::async_trait;
use healwright_core_types::ElementKey;
use serde_json::Value;
use std::sync::Arc;

/// Durable get/upsert contract shared by all backends.
///
/// Implementations must make `upsert` atomic per key; concurrent upserts to the
/// same key resolve last-write-wins.
#[async_trait]
pub trait SelectorStore: Send + Sync {
    /// Fetch the record for `key`, if one exists
    async fn get(&self, key: &ElementKey) -> Result<Option<PersistedElement>, StoreError>;

    /// Promote `working_locator` to the front of the record for `key`,
    /// creating the record on first use
    async fn upsert(
        &self,
        key: &ElementKey,
        working_locator: &str,
        metadata: Option<Value>,
    ) -> Result<PersistedElement, StoreError>;

    /// Merge externally discovered AI and fallback selectors into the record
    async fn record_discovery(
        &self,
        key: &ElementKey,
        discovery: Discovery,
    ) -> Result<PersistedElement, StoreError>;

    /// List records, optionally restricted to one scope (suite id or "global")
    async fn list(&self, scope: Option<&str>) -> Result<Vec<PersistedElement>, StoreError>;

    /// Delete the record for `key`; returns whether one existed
    async fn remove(&self, key: &ElementKey) -> Result<bool, StoreError>;
}

pub type SharedSelectorStore = Arc<dyn SelectorStore>;
