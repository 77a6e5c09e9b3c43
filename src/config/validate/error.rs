//! Validation error types

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("num_branches must be > 0, got {0}")]
    InvalidBranches(usize),

    #[error("mcts_iterations must be > 0, got {0}")]
    InvalidIterations(usize),

    #[error("reaction_samples must be > 0, got {0}")]
    InvalidReactionSamples(usize),

    #[error("pruning_interval must be > 0, got {0}")]
    InvalidPruningInterval(usize),

    #[error("exploration_constant must be finite and >= 0, got {0}")]
    InvalidExploration(f64),

    #[error("pruning_margin must be finite and >= 0, got {0}")]
    InvalidPruningMargin(f64),

    #[error("time_budget_secs must be finite and > 0, got {0}")]
    InvalidTimeBudget(f64),

    #[error("call_timeout_secs must be finite and > 0, got {0}")]
    InvalidCallTimeout(f64),

    #[error("max_tokens must be > 0, got {0}")]
    InvalidMaxTokens(u32),

    #[error("similarity_threshold must be in (0, 1], got {0}")]
    InvalidSimilarityThreshold(f64),
}
