//! healwright library
//!
//! Configuration, logging and store wiring shared by the CLI and integration tests

pub mod config;
pub mod logging;
pub mod stores;

pub use config::{load_config, HealConfig, LoadedConfig, StoreBackend};
pub use stores::open_store;
