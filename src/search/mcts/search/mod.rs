//! MCTS search controller.
//!
//! This module contains the iteration loop, the budget handling and the
//! records the search emits.

mod algorithm;
mod result;
mod stats;

#[cfg(test)]
mod tests;

// Re-export all public types
pub use algorithm::{select_winner, MctsSearch};
pub use result::{branch_index, BranchRecord, IterationRecord, SearchOutcome, SearchState};
pub use stats::SearchStatistics;
