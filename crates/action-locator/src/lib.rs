//! Self-healing locator resolution
//!
//! This crate turns a list of authored locator strategies into a verified action:
//! - Candidate building: persisted selector history first, authored strategies after
//! - Resolution: ordered candidates, bounded waits, fixed-backoff retry rounds
//! - Intelligent click/fill with post-condition verification
//! - Healing log of every attempt, with aggregate metrics
//! - Background write-back of the winning selector to the selector store

pub mod candidates;
pub mod errors;
pub mod executor;
pub mod healing_log;
pub mod resolver;
pub mod types;

pub use candidates::*;
pub use errors::*;
pub use executor::*;
pub use healing_log::*;
pub use resolver::*;
pub use types::*;
