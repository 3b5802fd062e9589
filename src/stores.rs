//! Selector store construction from configuration

use selector_store::{MemorySelectorStore, SharedSelectorStore, SqliteSelectorStore, StoreError};
use std::sync::Arc;
use tracing::info;

use crate::config::{StoreBackend, StoreSettings};

/// Open the configured backend
pub fn open_store(settings: &StoreSettings) -> Result<SharedSelectorStore, StoreError> {
    let store: SharedSelectorStore = match settings.backend {
        StoreBackend::Memory => {
            info!("Using in-memory selector store");
            Arc::new(MemorySelectorStore::new())
        }
        StoreBackend::Json => {
            let path = settings.resolved_path();
            info!(path = %path.display(), "Using JSON selector store");
            Arc::new(MemorySelectorStore::with_persistence(path)?)
        }
        StoreBackend::Sqlite => {
            let path = settings.resolved_path();
            info!(path = %path.display(), "Using SQLite selector store");
            Arc::new(SqliteSelectorStore::open(path)?)
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use healwright_core_types::ElementKey;

    #[tokio::test]
    async fn each_backend_opens_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let key = ElementKey::global("https://app.test", "login-btn").unwrap();

        for (backend, file) in [
            (StoreBackend::Json, "s.json"),
            (StoreBackend::Sqlite, "s.db"),
        ] {
            let settings = StoreSettings {
                backend,
                path: Some(dir.path().join(file)),
            };
            let store = open_store(&settings).unwrap();
            store.upsert(&key, "#login", None).await.unwrap();
            drop(store);

            let reopened = open_store(&settings).unwrap();
            let record = reopened.get(&key).await.unwrap().unwrap();
            assert_eq!(record.locator, "#login");
        }
    }

    #[tokio::test]
    async fn memory_backend_starts_empty() {
        let store = open_store(&StoreSettings {
            backend: StoreBackend::Memory,
            path: None,
        })
        .unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }
}
