//! Node types and statistics for the conversation tree.
//!
//! This module contains the node representation, statistics tracking,
//! and the UCB1 priority used by the selector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reward;
use crate::conversation::Message;

/// Unique identifier for nodes in the search tree
///
/// Ids are arena indices handed out in creation order, so comparing ids
/// compares creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Creates a new NodeId
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the underlying id value
    #[must_use]
    pub const fn value(&self) -> usize {
        self.0
    }
}

/// Lifecycle of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Created, no children requested yet
    Unexpanded,
    /// Has received children
    Expanded,
    /// Evaluated at least once
    Scored,
    /// Deactivated by the pruner
    Pruned,
    /// Expansion produced no children
    Failed,
}

impl NodeStatus {
    /// Pruned and Failed nodes are never selected
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, NodeStatus::Pruned | NodeStatus::Failed)
    }
}

/// Visit statistics for a node in the search tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStats {
    /// Total visits to this node
    pub visits: usize,
    /// Total accumulated reward
    pub total_reward: f64,
    /// Mean reward (total_reward / visits)
    pub mean_reward: f64,
}

impl NodeStats {
    /// Update statistics with a new reward
    pub fn update(&mut self, reward: Reward) {
        self.visits += 1;
        self.total_reward += reward;
        self.mean_reward = self.total_reward / self.visits as f64;
    }

    /// UCB1 priority: `mean + c * sqrt(2 ln(parent_visits) / visits)`
    ///
    /// Unvisited nodes, and children of an unvisited parent, get infinite
    /// priority.
    #[must_use]
    pub fn ucb1(&self, parent_visits: usize, c: f64) -> f64 {
        if self.visits == 0 || parent_visits == 0 {
            return f64::INFINITY;
        }
        let exploitation = self.mean_reward;
        let exploration = c * (2.0 * (parent_visits as f64).ln() / self.visits as f64).sqrt();
        exploitation + exploration
    }
}

/// Running per-name metric sums
///
/// Goal metric names can differ between evaluations, so each name keeps
/// its own sample count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricAccumulator {
    sums: BTreeMap<String, f64>,
    counts: BTreeMap<String, usize>,
}

impl MetricAccumulator {
    /// Add one sample per metric
    pub fn merge(&mut self, metrics: &BTreeMap<String, f64>) {
        for (name, value) in metrics {
            *self.sums.entry(name.clone()).or_insert(0.0) += value;
            *self.counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    /// Mean of every metric seen so far
    #[must_use]
    pub fn means(&self) -> BTreeMap<String, f64> {
        self.sums
            .iter()
            .map(|(name, sum)| {
                let n = self.counts.get(name).copied().unwrap_or(1).max(1);
                (name.clone(), sum / n as f64)
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// A node in the search tree: one candidate response in context
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Parent node id (None for root)
    pub parent: Option<NodeId>,
    /// Child node ids in creation order
    pub children: Vec<NodeId>,
    /// Response this node contributes (empty for root)
    pub response: String,
    /// History from the root through this node's response
    pub conversation: Vec<Message>,
    /// Distance from the root
    pub depth: usize,
    /// Statistics for this node
    pub stats: NodeStats,
    /// General metric accumulators
    pub general: MetricAccumulator,
    /// Goal metric accumulators
    pub goal: MetricAccumulator,
    pub status: NodeStatus,
    /// User turns of the best rollout from the latest evaluation
    pub simulated_reactions: Vec<String>,
    /// Messages simulated after this node in the best rollout
    pub sub_history: Vec<Message>,
    /// Mean general score of each scored rollout, across all evaluations
    pub rollout_means: Vec<f64>,
    /// An evaluation had no scorable rollout
    pub degraded: bool,
    /// Evaluations where every rollout failed to simulate
    pub failed_evaluations: usize,
}

impl Node {
    /// Create a new root node over the input history
    #[must_use]
    pub fn root(history: Vec<Message>) -> Self {
        Self::with_parts(NodeId::new(0), None, String::new(), history, 0)
    }

    /// Create a new child node
    #[must_use]
    pub fn child(id: NodeId, parent: NodeId, response: String, conversation: Vec<Message>, depth: usize) -> Self {
        Self::with_parts(id, Some(parent), response, conversation, depth)
    }

    fn with_parts(
        id: NodeId,
        parent: Option<NodeId>,
        response: String,
        conversation: Vec<Message>,
        depth: usize,
    ) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            response,
            conversation,
            depth,
            stats: NodeStats::default(),
            general: MetricAccumulator::default(),
            goal: MetricAccumulator::default(),
            status: NodeStatus::Unexpanded,
            simulated_reactions: Vec::new(),
            sub_history: Vec::new(),
            rollout_means: Vec::new(),
            degraded: false,
            failed_evaluations: 0,
        }
    }

    /// Creation order index
    #[must_use]
    pub fn order(&self) -> usize {
        self.id.value()
    }

    /// Returns true if this node is a leaf (no children)
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Mean score over all visits (0 when unvisited)
    #[must_use]
    pub fn avg_score(&self) -> f64 {
        self.stats.mean_reward
    }

    /// Returns true if this node accepts no more children
    ///
    /// A node short of `num_branches` children stays open until an
    /// expansion event for it yields nothing and marks it Failed.
    #[must_use]
    pub fn is_fully_expanded(&self, num_branches: usize) -> bool {
        self.status == NodeStatus::Failed || self.children.len() >= num_branches
    }

    /// Population variance of per-rollout general means
    #[must_use]
    pub fn rollout_variance(&self) -> f64 {
        let n = self.rollout_means.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.rollout_means.iter().sum::<f64>() / n as f64;
        self.rollout_means.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64
    }
}
