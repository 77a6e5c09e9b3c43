//! CLI argument types

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SearchConfig;

/// Colloquy: tree search over conversation continuations
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "colloquy")]
#[command(version)]
#[command(about = "Find the best next response in a conversation with Monte Carlo tree search")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Search a stored chat and store the analysis record
    Analyze(AnalyzeArgs),

    /// Validate a search configuration file
    Validate(ValidateArgs),
}

/// Arguments for the analyze command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct AnalyzeArgs {
    /// Chat to analyze
    #[arg(long)]
    pub chat_id: String,

    /// Directory holding `<chat_id>.json` histories
    #[arg(long, value_name = "DIR")]
    pub store: PathBuf,

    /// YAML search configuration
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Conversation goal for goal-specific metrics
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Override the iteration budget
    #[arg(short, long)]
    pub iterations: Option<usize>,

    /// Override branches per expansion
    #[arg(short, long)]
    pub branches: Option<usize>,

    /// Override the simulated depth
    #[arg(long)]
    pub depth: Option<usize>,

    /// Wall-clock budget in seconds
    #[arg(long, value_name = "SECS")]
    pub time_budget: Option<f64>,

    /// Override the UCB1 exploration constant
    #[arg(long)]
    pub exploration: Option<f64>,

    /// Use the built-in scripted service instead of the LLM endpoint
    #[arg(long)]
    pub scripted: bool,

    /// Also print the record as JSON on stdout
    #[arg(long)]
    pub print: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Parse arguments from an iterator, for tests and embedding
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides on top of a loaded configuration
pub fn apply_overrides(mut config: SearchConfig, args: &AnalyzeArgs) -> SearchConfig {
    if let Some(goal) = &args.goal {
        config = config.with_goal(goal.clone());
    }
    if let Some(iterations) = args.iterations {
        config = config.with_iterations(iterations);
    }
    if let Some(branches) = args.branches {
        config = config.with_branches(branches);
    }
    if let Some(depth) = args.depth {
        config = config.with_simulation_depth(depth);
    }
    if let Some(secs) = args.time_budget {
        // Left raw so validation reports bad values.
        config.time_budget_secs = Some(secs);
    }
    if let Some(c) = args.exploration {
        config = config.with_exploration(c);
    }
    config
}
