use clap::Subcommand;

use super::config::ConfigArgs;
use super::run::{RunArgs, ValidateArgs};
use super::selectors::SelectorsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run test case files in Chromium
    Run(RunArgs),

    /// Parse test case files without running them
    Validate(ValidateArgs),

    /// Inspect and edit persisted selector history
    Selectors(SelectorsArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}
