//! Unit tests for configuration validation

use super::*;
use crate::config::SearchConfig;

fn create_valid_config() -> SearchConfig {
    SearchConfig::default().with_branches(3).with_iterations(4).with_goal("reassure the user")
}

#[test]
fn test_valid_config() {
    let config = create_valid_config();
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_default_config_is_valid() {
    assert!(validate_config(&SearchConfig::default()).is_ok());
}

#[test]
fn test_zero_branches() {
    let config = create_valid_config().with_branches(0);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidBranches(0)));
}

#[test]
fn test_zero_iterations() {
    let config = create_valid_config().with_iterations(0);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidIterations(0)));
}

#[test]
fn test_zero_reaction_samples() {
    let config = create_valid_config().with_reaction_samples(0);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidReactionSamples(0)));
}

#[test]
fn test_zero_pruning_interval() {
    let config = create_valid_config().with_pruning(0, 0.2);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPruningInterval(0)));
}

#[test]
fn test_negative_exploration() {
    let config = create_valid_config().with_exploration(-1.0);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidExploration(_)));
}

#[test]
fn test_zero_exploration_is_allowed() {
    let config = create_valid_config().with_exploration(0.0);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_nan_pruning_margin() {
    let config = create_valid_config().with_pruning(5, f64::NAN);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPruningMargin(_)));
}

#[test]
fn test_non_positive_time_budget() {
    let mut config = create_valid_config();
    config.time_budget_secs = Some(0.0);
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidTimeBudget(_)));
}

#[test]
fn test_zero_call_timeout() {
    let mut config = create_valid_config();
    config.call_timeout_secs = 0.0;
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidCallTimeout(_)));
}

#[test]
fn test_similarity_threshold_out_of_range() {
    let mut config = create_valid_config();
    config.similarity_threshold = 1.5;
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidSimilarityThreshold(_)));
}

#[test]
fn test_zero_simulation_depth_is_allowed() {
    let config = create_valid_config().with_simulation_depth(0);
    assert!(validate_config(&config).is_ok());
}
