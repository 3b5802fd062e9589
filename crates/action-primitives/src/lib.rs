//! Action primitives for healing test runs
//!
//! This crate provides the page-facing building blocks the locator engine drives:
//! - `PageDriver`: the narrow surface a browser page must expose
//! - Verified click and fill actions (act, then check the post-condition)
//! - Selector syntax parsing shared by drivers
//! - Cancellable waiting helpers
//! - `InMemoryPage`, a scripted page used for dry runs and tests

mod driver;
pub mod errors;
pub mod memory;
mod primitives;
pub mod selector;
pub mod types;
mod waiting;

pub use driver::*;
pub use errors::*;
pub use memory::{InMemoryPage, MemoryElement};
pub use primitives::*;
pub use selector::SelectorExpr;
pub use types::*;
pub use waiting::*;
