use anyhow::Result;

use super::commands::Commands;
use super::config::cmd_config;
use super::context::CliContext;
use super::env::CliArgs;
use super::run::{cmd_run, cmd_validate};
use super::selectors::cmd_selectors;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx, cli.output).await,
        Commands::Validate(args) => cmd_validate(args, cli.output),
        Commands::Selectors(args) => cmd_selectors(args, ctx, cli.output).await,
        Commands::Config(args) => cmd_config(args, ctx, cli.output),
    }
}
