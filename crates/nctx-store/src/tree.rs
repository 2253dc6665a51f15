use std::collections::BTreeMap;

use nctx_types::{DataPath, MovePosition, PathStep};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::node::StoredNode;

/// One datastore's content.
///
/// Cloning is how callers get an isolated working copy: edits are applied
/// to a clone and the clone swapped in only once it is known to be good.
///
/// Entries of every list and leaf-list keep the order they were created
/// in, which [`move_entry`](Self::move_entry) can change. Queries return
/// nodes in document order: siblings by name, entries of one list in
/// their stored order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataTree {
    nodes: BTreeMap<String, StoredNode>,
    /// List path without the entry predicates, to entry keys in order.
    order: BTreeMap<String, Vec<String>>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &DataPath) -> Option<&StoredNode> {
        self.nodes.get(&path.to_string())
    }

    pub fn contains(&self, path: &DataPath) -> bool {
        self.nodes.contains_key(&path.to_string())
    }

    /// Store a node, replacing whatever was at its path. A replaced entry
    /// keeps its position.
    pub fn insert(&mut self, node: StoredNode) -> Option<StoredNode> {
        let key = node.key();
        if node.is_entry() && !self.nodes.contains_key(&key) {
            self.order.entry(list_key(&node.path)).or_default().push(key.clone());
        }
        self.nodes.insert(key, node)
    }

    /// Store a node that must not exist yet.
    pub fn create(&mut self, node: StoredNode) -> StoreResult<()> {
        let key = node.key();
        if self.nodes.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        self.insert(node);
        Ok(())
    }

    /// Remove every node at or below `path` and return them.
    ///
    /// A path without predicates on its last step removes all entries of
    /// that list or leaf-list. Fails if nothing matched.
    pub fn remove(&mut self, path: &DataPath) -> StoreResult<Vec<StoredNode>> {
        let doomed: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.path.matches(path))
            .map(|(key, _)| key.clone())
            .collect();
        if doomed.is_empty() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let removed: Vec<StoredNode> = doomed
            .iter()
            .filter_map(|key| self.nodes.remove(key))
            .collect();
        for node in removed.iter().filter(|node| node.is_entry()) {
            let list = list_key(&node.path);
            if let Some(entries) = self.order.get_mut(&list) {
                entries.retain(|key| *key != node.key());
                if entries.is_empty() {
                    self.order.remove(&list);
                }
            }
        }
        Ok(removed)
    }

    /// Reposition the list or leaf-list entry at `entry` among its
    /// siblings. Fails if the entry or the sibling it is anchored on is
    /// missing.
    pub fn move_entry(&mut self, entry: &DataPath, position: &MovePosition) -> StoreResult<()> {
        let key = entry.to_string();
        if !self.nodes.get(&key).is_some_and(StoredNode::is_entry) {
            return Err(StoreError::NotFound(key));
        }
        let anchor = position.anchor_path(entry).map(|path| path.to_string());
        if anchor.as_deref() == Some(key.as_str()) {
            return Ok(());
        }

        let entries = self.order.entry(list_key(entry)).or_default();
        let anchor_index = |entries: &[String], anchor: &str| {
            entries
                .iter()
                .position(|k| k == anchor)
                .ok_or_else(|| StoreError::NotFound(anchor.to_string()))
        };
        if let Some(anchor) = &anchor {
            anchor_index(&entries[..], anchor)?;
        }
        entries.retain(|k| *k != key);
        let index = match (position, &anchor) {
            (MovePosition::First, _) => 0,
            (MovePosition::Before(_), Some(anchor)) => anchor_index(&entries[..], anchor)?,
            (MovePosition::After(_), Some(anchor)) => anchor_index(&entries[..], anchor)? + 1,
            _ => entries.len(),
        };
        entries.insert(index, key);
        Ok(())
    }

    /// Entries of the list or leaf-list `list` addresses, in order.
    /// Predicates on the last step of `list` are ignored.
    pub fn list_entries(&self, list: &DataPath) -> Vec<&StoredNode> {
        self.order
            .get(&list_key(list))
            .map(|keys| keys.iter().filter_map(|key| self.nodes.get(key)).collect())
            .unwrap_or_default()
    }

    /// All nodes at or below `pattern`, in document order.
    pub fn query(&self, pattern: &DataPath) -> Vec<&StoredNode> {
        self.in_document_order(self.nodes.values().filter(|node| node.path.matches(pattern)))
    }

    /// Leaves and leaf-list entries at or below `pattern`, in document
    /// order.
    pub fn values(&self, pattern: &DataPath) -> Vec<&StoredNode> {
        self.in_document_order(
            self.nodes
                .values()
                .filter(|node| node.has_value() && node.path.matches(pattern)),
        )
    }

    /// Returns `true` if anything is stored at or below `path`.
    pub fn has_descendants(&self, path: &DataPath) -> bool {
        self.nodes.values().any(|node| node.path.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredNode> {
        self.nodes.values()
    }

    pub(crate) fn entries(&self) -> &BTreeMap<String, StoredNode> {
        &self.nodes
    }

    fn in_document_order<'a>(
        &'a self,
        nodes: impl Iterator<Item = &'a StoredNode>,
    ) -> Vec<&'a StoredNode> {
        let mut keyed: Vec<(Vec<(String, usize, String)>, &StoredNode)> = nodes
            .map(|node| (self.document_key(&node.path), node))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, node)| node).collect()
    }

    /// Per step: the step without predicates, the entry's position in its
    /// list, and the full step.
    fn document_key(&self, path: &DataPath) -> Vec<(String, usize, String)> {
        (1..=path.len())
            .map(|len| {
                let prefix = path.prefix(len);
                let list = list_key(&prefix);
                let full = prefix.to_string();
                let position = self
                    .order
                    .get(&list)
                    .and_then(|entries| entries.iter().position(|k| *k == full))
                    .unwrap_or(0);
                (list, position, full)
            })
            .collect()
    }

    /// Flat JSON rendering: canonical path to value (`null` for containers
    /// and list entries).
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .nodes
            .iter()
            .map(|(key, node)| {
                let value = node.literal.clone().map(Value::String).unwrap_or(Value::Null);
                (key.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}

/// `path` with the predicates of its last step dropped: the identity of
/// the list or leaf-list an entry belongs to.
fn list_key(path: &DataPath) -> String {
    let Some(last) = path.last() else {
        return path.to_string();
    };
    let step = PathStep {
        module: last.module.clone(),
        name: last.name.clone(),
        predicates: Vec::new(),
    };
    match path.parent() {
        Some(parent) => parent.child(step).to_string(),
        None => path.to_string(),
    }
}
