//! Conversation search
//!
//! Monte Carlo Tree Search where each node is a candidate assistant response.
//! Expansion, simulation and scoring are delegated to a
//! [`GenerationService`](crate::generation::GenerationService); the search
//! only schedules those calls, aggregates their results and bounds them by
//! an iteration and wall-clock budget.

pub mod mcts;

pub use mcts::{
    BranchRecord, IterationRecord, MctsSearch, Node, NodeId, NodeStats, NodeStatus, SearchOutcome,
    SearchState, SearchStatistics, SearchTree,
};
