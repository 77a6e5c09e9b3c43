//! Simulate-then-score for a single node.
//!
//! This is the unit of work spawned per node in an iteration's batch. It
//! takes owned inputs and returns a plain value, so it can run on any
//! worker while the tree stays untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::node::NodeId;
use super::scorer::{aggregate, score_rollouts, RolloutScore};
use super::simulator::{simulate, Rollout};
use super::Reward;
use crate::config::SearchConfig;
use crate::conversation::Message;
use crate::generation::{CallPolicy, GenerationService};

/// Outcome of evaluating one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeEvaluation {
    /// Node score in `[0, 1]`
    pub score: Reward,
    /// General metric means across scored rollouts
    pub general: BTreeMap<String, f64>,
    /// Goal metric means across scored rollouts
    pub goal: BTreeMap<String, f64>,
    /// General-metric mean of each scored rollout
    pub rollout_means: Vec<f64>,
    /// Simulated user turns of the best-scoring rollout
    pub reactions: Vec<String>,
    /// Simulated messages of the best-scoring rollout
    pub sub_history: Vec<Message>,
    pub rollouts_simulated: usize,
    pub rollouts_scored: usize,
}

impl NodeEvaluation {
    /// No rollout survived simulation
    #[must_use]
    pub fn simulation_failed(&self) -> bool {
        self.rollouts_simulated == 0
    }

    /// Rollouts were simulated but none could be scored
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.rollouts_simulated > 0 && self.rollouts_scored == 0
    }
}

/// Run rollouts from `conversation` and score them
pub async fn evaluate_node(
    service: Arc<dyn GenerationService>,
    id: NodeId,
    conversation: Vec<Message>,
    config: Arc<SearchConfig>,
    policy: CallPolicy,
) -> (NodeId, NodeEvaluation) {
    let rollouts = simulate(service.as_ref(), &conversation, &config, &policy).await;
    if rollouts.is_empty() {
        return (id, NodeEvaluation::default());
    }

    let goal = config.goal();
    let scores = score_rollouts(service.as_ref(), &rollouts, goal, &policy).await;
    (id, summarize(&rollouts, scores, goal.is_some()))
}

fn summarize(rollouts: &[Rollout], scores: Vec<Option<RolloutScore>>, goal_active: bool) -> NodeEvaluation {
    let scored: Vec<(&Rollout, RolloutScore)> =
        rollouts.iter().zip(scores).filter_map(|(r, s)| s.map(|s| (r, s))).collect();

    let sanitized: Vec<RolloutScore> = scored.iter().map(|(_, s)| s.clone()).collect();
    let agg = aggregate(&sanitized, goal_active);

    // Best rollout by its own combined score; the first wins on ties.
    let mut best: Option<(&Rollout, f64)> = None;
    for (rollout, score) in &scored {
        let value = score.combined(goal_active);
        match best {
            Some((_, b)) if value <= b => {}
            _ => best = Some((*rollout, value)),
        }
    }
    // Fall back to the first simulated rollout when nothing was scored.
    let exported = best.map(|(r, _)| r).or_else(|| rollouts.first());

    NodeEvaluation {
        score: agg.score,
        general: agg.general,
        goal: agg.goal,
        rollout_means: sanitized.iter().map(RolloutScore::general_mean).collect(),
        reactions: exported.map(Rollout::reactions).unwrap_or_default(),
        sub_history: exported.map(|r| r.simulated().to_vec()).unwrap_or_default(),
        rollouts_simulated: rollouts.len(),
        rollouts_scored: scored.len(),
    }
}
