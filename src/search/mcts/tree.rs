//! Search tree structure.
//!
//! All nodes live in one arena owned by the tree. Parents own their
//! children through id lists; the parent id on a child is only used to walk
//! ancestors.

use super::node::{Node, NodeId, NodeStatus};
use crate::conversation::Message;

/// The search tree structure
#[derive(Debug, Clone)]
pub struct SearchTree {
    /// All nodes indexed by NodeId
    nodes: Vec<Node>,
    /// Root node id
    pub(crate) root_id: NodeId,
    /// Completed iterations
    iterations: usize,
}

impl SearchTree {
    /// Create a new search tree rooted at the input history
    #[must_use]
    pub fn new(history: Vec<Message>) -> Self {
        Self { nodes: vec![Node::root(history)], root_id: NodeId::new(0), iterations: 0 }
    }

    /// Get the root node
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[self.root_id.0]
    }

    #[must_use]
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Get a node by id
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Add a child carrying `response`, returning its id
    ///
    /// The child's conversation is the parent's with the response appended
    /// as an assistant turn. Returns `None` if `parent_id` is unknown.
    pub fn add_child(&mut self, parent_id: NodeId, response: String) -> Option<NodeId> {
        let child_id = NodeId::new(self.nodes.len());
        let parent = self.nodes.get_mut(parent_id.0)?;

        let mut conversation = parent.conversation.clone();
        conversation.push(Message::assistant(response.clone()));
        let depth = parent.depth + 1;

        parent.children.push(child_id);
        if parent.status == NodeStatus::Unexpanded {
            parent.status = NodeStatus::Expanded;
        }

        self.nodes.push(Node::child(child_id, parent_id, response, conversation, depth));
        Some(child_id)
    }

    /// Get number of nodes in the tree
    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Get all children of a node
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<&Node> {
        self.nodes
            .get(id.0)
            .map(|n| n.children.iter().filter_map(|&cid| self.get(cid)).collect())
            .unwrap_or_default()
    }

    /// Ids from `id` up to and including the root
    #[must_use]
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.get(id).map(|n| n.id);
        while let Some(cid) = current {
            path.push(cid);
            current = self.get(cid).and_then(|n| n.parent);
        }
        path
    }

    /// Returns true if no selectable node remains below and including `id`
    ///
    /// A node is exhausted when it is Pruned or Failed, or fully expanded
    /// with every child exhausted.
    #[must_use]
    pub fn is_exhausted(&self, id: NodeId, num_branches: usize) -> bool {
        let Some(node) = self.get(id) else {
            return true;
        };
        if !node.status.is_active() {
            return true;
        }
        if !node.is_fully_expanded(num_branches) {
            return false;
        }
        node.children.iter().all(|&cid| self.is_exhausted(cid, num_branches))
    }

    /// Completed iterations
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub(crate) fn advance_iteration(&mut self) {
        self.iterations += 1;
    }
}
