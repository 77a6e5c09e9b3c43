//! Validate command implementation

use crate::cli::ValidateArgs;
use crate::config::{load_config, SearchConfig};
use crate::error::Result;

/// One-line-per-field summary of a configuration
pub fn format_config_summary(config: &SearchConfig) -> String {
    let mut lines = vec![
        format!("  Branches per expansion: {}", config.num_branches),
        format!("  Iterations: {}", config.mcts_iterations),
        format!("  Simulation depth: {}", config.simulation_depth),
        format!("  Reaction samples: {}", config.reaction_samples),
        format!("  Exploration constant: {:.3}", config.exploration_constant),
        format!(
            "  Pruning: every {} iterations, margin {}, min visits {}",
            config.pruning_interval, config.pruning_margin, config.min_visits_for_pruning
        ),
    ];
    if let Some(budget) = config.time_budget_secs {
        lines.push(format!("  Time budget: {budget}s"));
    }
    if let Some(goal) = config.goal() {
        lines.push(format!("  Goal: {goal}"));
    }
    lines.join("\n")
}

pub fn run_validate(args: &ValidateArgs, quiet: bool) -> Result<()> {
    let config = load_config(&args.config)?;
    if !quiet {
        println!("Configuration {} is valid", args.config.display());
        println!("{}", format_config_summary(&config));
    }
    Ok(())
}
