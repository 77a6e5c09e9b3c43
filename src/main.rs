//! Colloquy CLI
//!
//! # Usage
//!
//! ```bash
//! # Analyze a stored chat
//! colloquy analyze --chat-id chat-42 --store ./chats --goal "help them decide"
//!
//! # Dry run without an LLM endpoint
//! colloquy analyze --chat-id chat-42 --store ./chats --scripted
//!
//! # Validate config
//! colloquy validate search.yaml
//! ```

use clap::Parser;
use colloquy::cli::{init_tracing, run_command, Cli, LogLevel};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_user_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
