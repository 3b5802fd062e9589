use std::path::Path;

use anyhow::{Context, Result};
use healwright::{open_store, HealConfig, LoadedConfig};
use selector_store::SharedSelectorStore;
use tokio::sync::OnceCell;

pub struct CliContext {
    loaded: LoadedConfig,
    store: OnceCell<SharedSelectorStore>,
}

impl CliContext {
    pub fn new(loaded: LoadedConfig) -> Self {
        Self {
            loaded,
            store: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &HealConfig {
        &self.loaded.config
    }

    pub fn config_path(&self) -> &Path {
        &self.loaded.path
    }

    pub fn config_from_file(&self) -> bool {
        self.loaded.from_file
    }

    /// Selector store, opened on first use
    pub async fn store(&self) -> Result<SharedSelectorStore> {
        self.store
            .get_or_try_init(|| async {
                open_store(&self.loaded.config.store).with_context(|| {
                    format!(
                        "opening {:?} selector store at {}",
                        self.loaded.config.store.backend,
                        self.loaded.config.store.resolved_path().display()
                    )
                })
            })
            .await
            .cloned()
    }
}
