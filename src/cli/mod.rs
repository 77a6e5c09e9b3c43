//! CLI module for colloquy
//!
//! # Usage
//!
//! ```bash
//! # Analyze a stored chat with the OpenAI-compatible service
//! colloquy analyze --chat-id chat-42 --store ./chats
//!
//! # Override search parameters
//! colloquy analyze --chat-id chat-42 --store ./chats --config search.yaml --goal "de-escalate" --iterations 20
//!
//! # Validate a search configuration
//! colloquy validate search.yaml
//! ```

mod args;
mod commands;
mod logging;

pub use args::{apply_overrides, parse_args, AnalyzeArgs, Cli, Command, ValidateArgs};
pub use commands::run_command;
pub use logging::{init_tracing, LogLevel};
