//! Configuration validation logic

use super::error::ValidationError;
use crate::config::SearchConfig;

/// Validate a search configuration
///
/// Checks:
/// - Counts that drive the search loop are > 0
/// - The exploration constant and pruning margin are finite and non-negative
/// - The time budget and per-call timeout are finite and positive
/// - The similarity threshold is in (0, 1]
pub fn validate_config(config: &SearchConfig) -> Result<(), ValidationError> {
    if config.num_branches == 0 {
        return Err(ValidationError::InvalidBranches(config.num_branches));
    }
    if config.mcts_iterations == 0 {
        return Err(ValidationError::InvalidIterations(config.mcts_iterations));
    }
    if config.reaction_samples == 0 {
        return Err(ValidationError::InvalidReactionSamples(config.reaction_samples));
    }
    if config.pruning_interval == 0 {
        return Err(ValidationError::InvalidPruningInterval(config.pruning_interval));
    }
    if config.max_tokens == 0 {
        return Err(ValidationError::InvalidMaxTokens(config.max_tokens));
    }

    let c = config.exploration_constant;
    if !c.is_finite() || c < 0.0 {
        return Err(ValidationError::InvalidExploration(c));
    }

    let margin = config.pruning_margin;
    if !margin.is_finite() || margin < 0.0 {
        return Err(ValidationError::InvalidPruningMargin(margin));
    }

    if let Some(budget) = config.time_budget_secs {
        if !budget.is_finite() || budget <= 0.0 {
            return Err(ValidationError::InvalidTimeBudget(budget));
        }
    }

    let timeout = config.call_timeout_secs;
    if !timeout.is_finite() || timeout <= 0.0 {
        return Err(ValidationError::InvalidCallTimeout(timeout));
    }

    let threshold = config.similarity_threshold;
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(ValidationError::InvalidSimilarityThreshold(threshold));
    }

    Ok(())
}
