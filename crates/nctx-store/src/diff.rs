//! Tree-level diff: compare two data trees node by node.

use crate::node::StoredNode;
use crate::tree::DataTree;

/// The result of comparing two data trees.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Changes in canonical path order.
    pub changes: Vec<NodeChange>,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of created nodes.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, NodeChange::Created { .. }))
            .count()
    }

    /// Number of deleted nodes.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, NodeChange::Deleted { .. }))
            .count()
    }

    /// Number of nodes whose value changed.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, NodeChange::Modified { .. }))
            .count()
    }
}

/// A single change between two data trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeChange {
    Created { node: StoredNode },
    Deleted { node: StoredNode },
    Modified { old: StoredNode, new: StoredNode },
}

impl NodeChange {
    /// The node the change applies to, as it is after the change (or was
    /// before a deletion).
    pub fn node(&self) -> &StoredNode {
        match self {
            NodeChange::Created { node } | NodeChange::Deleted { node } => node,
            NodeChange::Modified { new, .. } => new,
        }
    }

    /// Canonical path of the changed node.
    pub fn key(&self) -> String {
        self.node().key()
    }
}

/// Compute the diff between two data trees.
///
/// Nodes only in `new` are `Created`, nodes only in `old` are `Deleted`,
/// and nodes in both whose value or kind differs are `Modified`.
pub fn diff_trees(old: &DataTree, new: &DataTree) -> TreeDiff {
    let old_nodes = old.entries();
    let new_nodes = new.entries();
    let mut changes = Vec::new();

    let mut keys: Vec<&String> = old_nodes.keys().chain(new_nodes.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        match (old_nodes.get(key), new_nodes.get(key)) {
            (Some(before), Some(after)) => {
                if before != after {
                    changes.push(NodeChange::Modified {
                        old: before.clone(),
                        new: after.clone(),
                    });
                }
            }
            (Some(before), None) => changes.push(NodeChange::Deleted {
                node: before.clone(),
            }),
            (None, Some(after)) => changes.push(NodeChange::Created {
                node: after.clone(),
            }),
            (None, None) => {}
        }
    }

    TreeDiff { changes }
}
