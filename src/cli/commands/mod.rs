//! CLI command implementations

mod analyze;
mod validate;


use crate::cli::{Cli, Command};
use crate::error::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => analyze::run_analyze(args, cli.quiet).await,
        Command::Validate(args) => validate::run_validate(&args, cli.quiet),
    }
}
