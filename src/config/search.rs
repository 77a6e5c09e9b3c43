//! Per-search parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a conversation search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Branches generated per expansion event
    pub num_branches: usize,
    /// Continuation/reaction turn pairs simulated after the first reaction
    pub simulation_depth: usize,
    /// Token limit passed to branch and continuation requests
    pub max_tokens: u32,
    /// Maximum number of search iterations
    pub mcts_iterations: usize,
    /// Exploration constant for UCB1 (higher = more exploration)
    pub exploration_constant: f64,
    /// Goal that enables goal metrics and the 50/50 score blend
    pub conversation_goal: Option<String>,
    /// Wall-clock budget for the whole search (None = iterations only)
    pub time_budget_secs: Option<f64>,
    /// Pruner runs after every this many completed iterations
    pub pruning_interval: usize,
    /// A child is pruned when its average trails the best sibling by more than this
    pub pruning_margin: f64,
    /// Minimum visits before a child becomes eligible for pruning
    pub min_visits_for_pruning: usize,
    /// Rollouts simulated per evaluated node
    pub reaction_samples: usize,
    /// Retries after the first failed attempt of any external call
    pub call_retries: u32,
    /// Timeout applied to each individual external call
    pub call_timeout_secs: f64,
    /// Base delay of the exponential retry backoff
    pub retry_backoff_ms: u64,
    /// Regenerations allowed per slot when a branch duplicates a sibling
    pub diversity_retries: u32,
    /// Token Jaccard similarity at or above which two branches are duplicates
    pub similarity_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_branches: 5,
            simulation_depth: 3,
            max_tokens: 250,
            mcts_iterations: 10,
            exploration_constant: std::f64::consts::SQRT_2,
            conversation_goal: None,
            time_budget_secs: None,
            pruning_interval: 5,
            pruning_margin: 0.2,
            min_visits_for_pruning: 2,
            reaction_samples: 3,
            call_retries: 2,
            call_timeout_secs: 60.0,
            retry_backoff_ms: 250,
            diversity_retries: 2,
            similarity_threshold: 0.85,
        }
    }
}

impl SearchConfig {
    /// Set the number of branches per expansion
    pub fn with_branches(mut self, num_branches: usize) -> Self {
        self.num_branches = num_branches;
        self
    }

    /// Set the rollout depth
    pub fn with_simulation_depth(mut self, depth: usize) -> Self {
        self.simulation_depth = depth;
        self
    }

    /// Set the iteration budget
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.mcts_iterations = iterations;
        self
    }

    /// Set the UCB1 exploration constant
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Set the conversation goal
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.conversation_goal = Some(goal.into());
        self
    }

    /// Set the wall-clock budget
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_secs = Some(budget.as_secs_f64());
        self
    }

    /// Set pruning interval and margin
    pub fn with_pruning(mut self, interval: usize, margin: f64) -> Self {
        self.pruning_interval = interval;
        self.pruning_margin = margin;
        self
    }

    /// Set the per-call retry count
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.call_retries = retries;
        self
    }

    /// Set the number of rollouts per evaluated node
    pub fn with_reaction_samples(mut self, samples: usize) -> Self {
        self.reaction_samples = samples;
        self
    }

    /// Active goal, with blank goals treated as absent
    pub fn goal(&self) -> Option<&str> {
        self.conversation_goal.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }

    /// Wall-clock budget as a duration
    ///
    /// Values that validation rejects (negative, non-finite) map to `None`.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Per-call timeout as a duration, zero when out of range
    pub fn call_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.call_timeout_secs).unwrap_or(Duration::ZERO)
    }

    /// Base retry backoff as a duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
