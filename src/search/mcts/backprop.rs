//! Backpropagation of evaluation results.
//!
//! Runs on the controller after an iteration's batch has joined, so every
//! update sees a settled tree.

use tracing::trace;

use super::evaluate::NodeEvaluation;
use super::node::{NodeId, NodeStatus};
use super::tree::SearchTree;
use super::Reward;

/// Fold one evaluation into its own node
///
/// Counts a visit even when the simulation failed. Returns false if the id
/// is unknown.
pub fn apply_evaluation(tree: &mut SearchTree, id: NodeId, eval: &NodeEvaluation) -> bool {
    let Some(node) = tree.get_mut(id) else {
        return false;
    };

    node.stats.update(eval.score);
    node.general.merge(&eval.general);
    node.goal.merge(&eval.goal);
    node.rollout_means.extend_from_slice(&eval.rollout_means);

    if eval.simulation_failed() {
        node.failed_evaluations += 1;
    } else {
        node.simulated_reactions = eval.reactions.clone();
        node.sub_history = eval.sub_history.clone();
        node.degraded = eval.degraded();
    }

    if node.status.is_active() {
        node.status = NodeStatus::Scored;
    }
    true
}

/// Add one visit carrying `score` to `from` and every ancestor
pub fn propagate(tree: &mut SearchTree, from: Option<NodeId>, score: Reward) {
    let mut current = from;
    while let Some(id) = current {
        let Some(node) = tree.get_mut(id) else {
            break;
        };
        node.stats.update(score);
        trace!(node = id.value(), visits = node.stats.visits, "propagated");
        current = node.parent;
    }
}

/// Apply an iteration's finished batch below `frontier`
///
/// Every evaluated node gets its own update. The frontier and its
/// ancestors then get a single update with the batch mean, so the root
/// gains exactly one visit per iteration and ancestor averages are means
/// of batch means. When the frontier evaluated itself the chain starts at
/// its parent. An empty batch leaves the frontier untouched and repeats
/// its current average from the parent up. Returns the batch mean.
pub fn backpropagate_batch(
    tree: &mut SearchTree,
    frontier: NodeId,
    results: &[(NodeId, NodeEvaluation)],
) -> Option<Reward> {
    if results.is_empty() {
        let (avg, parent) = tree.get(frontier).map_or((0.0, None), |n| (n.avg_score(), n.parent));
        propagate(tree, parent, avg);
        return None;
    }

    let mut evaluated_frontier = false;
    for (id, eval) in results {
        apply_evaluation(tree, *id, eval);
        evaluated_frontier |= *id == frontier;
    }

    let mean = results.iter().map(|(_, e)| e.score).sum::<f64>() / results.len() as f64;
    let start = if evaluated_frontier {
        tree.get(frontier).and_then(|n| n.parent)
    } else {
        Some(frontier)
    };
    propagate(tree, start, mean);
    Some(mean)
}
