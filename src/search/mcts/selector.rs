//! UCB1 selection.
//!
//! Selection never mutates the tree.

use super::node::NodeId;
use super::tree::SearchTree;
use crate::config::SearchConfig;

/// Descend from the root to the node the next iteration works on
///
/// At each step the live child with the highest UCB1 priority wins; ties go
/// to the earliest-created child. The descent stops at the first node that
/// still accepts children. Returns `None` when the root is exhausted.
#[must_use]
pub fn select(tree: &SearchTree, config: &SearchConfig) -> Option<NodeId> {
    let num_branches = config.num_branches;
    let mut current = tree.root_id();
    if tree.is_exhausted(current, num_branches) {
        return None;
    }

    loop {
        let node = tree.get(current)?;
        if !node.is_fully_expanded(num_branches) || node.is_leaf() {
            return Some(current);
        }

        let parent_visits = node.stats.visits;
        let mut best: Option<(NodeId, f64)> = None;
        for &cid in &node.children {
            if tree.is_exhausted(cid, num_branches) {
                continue;
            }
            let Some(child) = tree.get(cid) else {
                continue;
            };
            let priority = child.stats.ucb1(parent_visits, config.exploration_constant);
            // Strict comparison keeps the earliest child on ties, infinite ones included.
            match best {
                Some((_, p)) if priority <= p => {}
                _ => best = Some((cid, priority)),
            }
        }

        current = best?.0;
    }
}
