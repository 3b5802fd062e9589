//! Test case execution
//!
//! Test cases are data: an ordered list of navigate, click, fill, wait and
//! URL-assertion steps, loaded from YAML or JSON. The runner executes them
//! sequentially on one page, routing click and fill through healing
//! resolution, and returns a summary with the healing log of the execution.

pub mod errors;
pub mod loader;
pub mod runner;
pub mod types;

pub use errors::FlowError;
pub use loader::{load_case, parse_case, validate_case, CaseFormat};
pub use runner::TestRunner;
pub use types::{
    to_strategies, ExecutionStatus, ExecutionSummary, FailureStrategy, StepAction, StepResult,
    StrategySpec, TestCase, TestStep,
};
