//! Property-based tests for configuration validation

use super::*;
use crate::config::SearchConfig;
use proptest::prelude::*;

fn arb_valid_config() -> impl Strategy<Value = SearchConfig> {
    (1usize..16, 0usize..6, 1usize..50, 0.0f64..5.0, 1usize..10, 0.0f64..1.0, 1usize..6).prop_map(
        |(branches, depth, iterations, c, interval, margin, samples)| {
            SearchConfig::default()
                .with_branches(branches)
                .with_simulation_depth(depth)
                .with_iterations(iterations)
                .with_exploration(c)
                .with_pruning(interval, margin)
                .with_reaction_samples(samples)
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_configs_pass(config in arb_valid_config()) {
        prop_assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn prop_zero_branches_always_fails(config in arb_valid_config()) {
        let config = config.with_branches(0);
        prop_assert!(matches!(
            validate_config(&config),
            Err(ValidationError::InvalidBranches(0))
        ));
    }

    #[test]
    fn prop_negative_exploration_fails(config in arb_valid_config(), c in -100.0f64..-0.001) {
        let config = config.with_exploration(c);
        prop_assert!(matches!(
            validate_config(&config),
            Err(ValidationError::InvalidExploration(_))
        ));
    }

    #[test]
    fn prop_positive_budget_passes(config in arb_valid_config(), secs in 0.01f64..3600.0) {
        let mut config = config;
        config.time_budget_secs = Some(secs);
        prop_assert!(validate_config(&config).is_ok());
    }
}
