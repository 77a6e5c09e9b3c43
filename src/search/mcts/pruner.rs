//! Sibling pruning.
//!
//! A child is pruned when it trails its best-scoring sibling by more than
//! `pruning_margin` after at least `min_visits_for_pruning` visits. Pruned
//! nodes stay in the tree and are exported, but are never selected again.

use tracing::info;

use super::node::{NodeId, NodeStatus};
use super::tree::SearchTree;
use crate::config::SearchConfig;

/// Prune underperforming siblings across the whole tree
///
/// Only active, visited children compete. The first child holding the best
/// average is always kept. Returns the newly pruned ids in id order.
pub fn prune(tree: &mut SearchTree, config: &SearchConfig) -> Vec<NodeId> {
    let mut doomed = Vec::new();

    for parent in tree.nodes() {
        if !parent.status.is_active() || parent.children.len() < 2 {
            continue;
        }

        let scored: Vec<_> = parent
            .children
            .iter()
            .filter_map(|&cid| tree.get(cid))
            .filter(|c| c.status.is_active() && c.stats.visits > 0)
            .collect();

        let Some(best) = scored.iter().copied().reduce(|b, c| if c.avg_score() > b.avg_score() { c } else { b })
        else {
            continue;
        };
        let floor = best.avg_score() - config.pruning_margin;

        doomed.extend(
            scored
                .iter()
                .filter(|c| c.id != best.id)
                .filter(|c| c.avg_score() < floor && c.stats.visits >= config.min_visits_for_pruning)
                .map(|c| c.id),
        );
    }

    doomed.sort();
    for &id in &doomed {
        if let Some(node) = tree.get_mut(id) {
            info!(
                node = id.value(),
                avg = node.avg_score(),
                visits = node.stats.visits,
                "pruned branch"
            );
            node.status = NodeStatus::Pruned;
        }
    }
    doomed
}
