//! Search outcome records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats::SearchStatistics;
use crate::conversation::Message;
use crate::search::mcts::node::{Node, NodeId, NodeStatus};

/// Lifecycle of a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Idle,
    Running,
    /// Iteration budget used up, or no live frontier left
    Completed,
    /// Wall-clock budget ran out; the outcome is partial
    TimedOut,
    /// The root produced no branch at all
    Failed,
}

/// Branch list index of a node; the root has none
///
/// Branches are the non-root nodes in creation order, so node `n` is
/// branch `n - 1`.
#[must_use]
pub fn branch_index(id: NodeId) -> Option<usize> {
    id.value().checked_sub(1)
}

/// Exported view of one non-root node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub response: String,
    /// Average score over all visits
    pub score: f64,
    pub visits: usize,
    pub general_metrics: BTreeMap<String, f64>,
    pub goal_metrics: BTreeMap<String, f64>,
    /// `None` for children of the root
    pub parent_index: Option<usize>,
    pub children_indices: Vec<usize>,
    pub status: NodeStatus,
    pub depth: usize,
    pub simulated_reactions: Vec<String>,
    pub sub_history: Vec<Message>,
    pub degraded: bool,
}

impl BranchRecord {
    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            response: node.response.clone(),
            score: node.avg_score(),
            visits: node.stats.visits,
            general_metrics: node.general.means(),
            goal_metrics: node.goal.means(),
            parent_index: node.parent.and_then(branch_index),
            children_indices: node.children.iter().filter_map(|&c| branch_index(c)).collect(),
            status: node.status,
            depth: node.depth,
            simulated_reactions: node.simulated_reactions.clone(),
            sub_history: node.sub_history.clone(),
            degraded: node.degraded,
        }
    }

    /// Direct child of the root
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_index.is_none()
    }
}

/// What one completed iteration did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based
    pub iteration: usize,
    /// Branch index of the frontier, `None` when it was the root
    pub frontier: Option<usize>,
    /// Branch indices evaluated in this iteration
    pub batch: Vec<usize>,
    /// The frontier was expanded in this iteration
    pub expanded: bool,
    /// Mean score of the batch, `None` for an empty batch
    pub mean_score: Option<f64>,
    /// Branch indices pruned after this iteration
    pub pruned: Vec<usize>,
}

/// Result of a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Every non-root node in creation order
    pub branches: Vec<BranchRecord>,
    pub selected_branch_index: usize,
    pub selected_response: String,
    pub rationale: String,
    pub mcts_statistics: SearchStatistics,
    pub state: SearchState,
    /// Per-iteration log
    pub iterations: Vec<IterationRecord>,
}

impl SearchOutcome {
    /// The winning branch
    #[must_use]
    pub fn selected(&self) -> Option<&BranchRecord> {
        self.branches.get(self.selected_branch_index)
    }

    /// Branches directly below the root, with their branch indices
    pub fn top_level(&self) -> impl Iterator<Item = (usize, &BranchRecord)> {
        self.branches.iter().enumerate().filter(|(_, b)| b.is_top_level())
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.mcts_statistics.partial
    }
}
