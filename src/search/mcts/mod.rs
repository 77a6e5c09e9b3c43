//! Monte Carlo Tree Search over conversation continuations.
//!
//! # Overview
//!
//! Each iteration runs the four classic phases:
//!
//! - **Selection**: descend from the root by UCB1 to a node that still
//!   accepts children ([`selector`])
//! - **Expansion**: ask the service for up to `num_branches` diverse
//!   responses at that node ([`expander`])
//! - **Simulation**: play out `reaction_samples` short conversations after
//!   every new node and score them ([`simulator`], [`scorer`]), all
//!   concurrently
//! - **Backpropagation**: fold the scores into the nodes and their
//!   ancestors once the whole batch has joined ([`backprop`])
//!
//! Every `pruning_interval` iterations the [`pruner`] deactivates children
//! that trail their best sibling by more than `pruning_margin`.
//!
//! The tree is mutated only between iterations, on the controller's task.
//! Concurrent work receives owned snapshots and returns plain values.

pub mod backprop;
pub mod expander;
mod evaluate;
mod node;
pub mod pruner;
pub mod scorer;
mod search;
pub mod selector;
pub mod simulator;
mod tree;

pub use evaluate::{evaluate_node, NodeEvaluation};
pub use node::{MetricAccumulator, Node, NodeId, NodeStats, NodeStatus};
pub use search::{
    branch_index, select_winner, BranchRecord, IterationRecord, MctsSearch, SearchOutcome, SearchState,
    SearchStatistics,
};
pub use tree::SearchTree;

/// Score in `[0, 1]` produced by evaluating a node
pub type Reward = f64;
