//! Search statistics.

use serde::{Deserialize, Serialize};

use crate::search::mcts::tree::SearchTree;

/// Statistics from a search run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    /// Number of completed iterations
    pub total_iterations: usize,
    /// Non-root nodes in the tree
    pub nodes_created: usize,
    /// Evaluations folded into the tree
    pub nodes_evaluated: usize,
    /// Nodes deactivated by the pruner
    pub pruned_branches: usize,
    /// Evaluation tasks launched, including ones discarded at the deadline
    pub parallel_evaluations: usize,
    /// Mean depth of the non-root leaves
    pub average_depth_explored: f64,
    /// The wall-clock budget cut the search short
    pub partial: bool,
    /// Evaluations where no rollout could be simulated
    #[serde(default)]
    pub failed_evaluations: usize,
}

/// Counters the controller keeps while the tree changes
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchCounters {
    pub launched: usize,
    pub evaluated: usize,
    pub pruned: usize,
    pub failed_evaluations: usize,
}

impl SearchStatistics {
    pub(crate) fn collect(tree: &SearchTree, counters: &SearchCounters, partial: bool) -> Self {
        let (depth_sum, leaves) = tree
            .nodes()
            .filter(|n| !n.is_root() && n.is_leaf())
            .fold((0usize, 0usize), |(sum, count), n| (sum + n.depth, count + 1));
        let average_depth_explored = if leaves == 0 { 0.0 } else { depth_sum as f64 / leaves as f64 };

        Self {
            total_iterations: tree.iterations(),
            nodes_created: tree.size().saturating_sub(1),
            nodes_evaluated: counters.evaluated,
            pruned_branches: counters.pruned,
            parallel_evaluations: counters.launched,
            average_depth_explored,
            partial,
            failed_evaluations: counters.failed_evaluations,
        }
    }
}
