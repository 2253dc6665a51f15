//! Applying `edit-config` records to a data tree.

use nctx_coerce::CoercionEngine;
use nctx_protocol::{EditRecord, ErrorTag, ErrorType, RpcError};
use nctx_schema::PathResolver;
use nctx_store::{DataTree, StoreError, StoredNode};
use nctx_txn::EditOperation;
use nctx_types::{DataPath, NodeKind, PathError, PathStep, Predicate, SchemaNode};

/// Applies edits with NETCONF `edit-config` semantics.
///
/// Values are stored as given. Whether they fit their leaf's type is
/// decided at commit time by the gate, so one bad value rejects the whole
/// commit rather than the edit that carried it.
pub(crate) struct EditApplier<'a> {
    pub resolver: &'a PathResolver,
    pub engine: &'a CoercionEngine,
}

impl EditApplier<'_> {
    /// Apply a batch, all or nothing: on error `tree` is left untouched.
    pub fn apply_all(&self, tree: &mut DataTree, edits: &[EditRecord]) -> Result<(), RpcError> {
        let mut scratch = tree.clone();
        for edit in edits {
            self.apply(&mut scratch, edit)?;
        }
        *tree = scratch;
        Ok(())
    }

    pub fn apply(&self, tree: &mut DataTree, edit: &EditRecord) -> Result<(), RpcError> {
        let resolved = self.resolver.resolve(&edit.path).map_err(path_error)?;
        let Some(node) = resolved.node else {
            return Err(RpcError::unknown_element(&edit.path, "not an editable node"));
        };
        if !node.config {
            return Err(RpcError::access_denied(
                resolved.path.to_string(),
                "state data is read-only",
            ));
        }
        let path = resolved.path;

        match edit.operation {
            EditOperation::Set => self.set(tree, path, &node, edit.value.as_deref()),
            EditOperation::Create | EditOperation::CreateListEntry => {
                self.create(tree, path, &node, edit.value.as_deref())
            }
            EditOperation::Delete => remove(tree, &path),
            EditOperation::RemoveListEntry => {
                if !(node.is_list() || node.is_leaf_list()) {
                    return Err(not_an_entry(&path, &node));
                }
                let path = leaf_list_entry_path(path, &node, edit.value.as_deref());
                remove(tree, &path)
            }
            EditOperation::Move => self.move_entry(tree, path, &node, edit),
        }
    }

    fn move_entry(
        &self,
        tree: &mut DataTree,
        path: DataPath,
        node: &SchemaNode,
        edit: &EditRecord,
    ) -> Result<(), RpcError> {
        if !node.is_user_ordered() {
            return Err(RpcError::invalid_value(
                path.to_string(),
                format!("a {} that isn't ordered-by user cannot be moved", node.kind.name()),
            ));
        }
        let position = edit.insert.as_ref().ok_or_else(|| {
            RpcError::new(ErrorType::Application, ErrorTag::MissingElement, "move needs a position")
                .at(path.to_string())
        })?;
        let path = leaf_list_entry_path(path, node, edit.value.as_deref());
        // Anchors are resolved like any path so their predicates are canonical.
        let position = match position.anchor_path(&path) {
            Some(anchor) => {
                let resolved = self
                    .resolver
                    .resolve_data_path(&anchor)
                    .map_err(path_error)?;
                let predicates = resolved
                    .path
                    .last()
                    .map(|step| step.predicates.clone())
                    .unwrap_or_default();
                position.with_anchor(predicates)
            }
            None => position.clone(),
        };
        tree.move_entry(&path, &position).map_err(store_error)
    }

    fn set(
        &self,
        tree: &mut DataTree,
        path: DataPath,
        node: &SchemaNode,
        value: Option<&str>,
    ) -> Result<(), RpcError> {
        if !node.is_leaf() {
            return Err(RpcError::invalid_value(
                path.to_string(),
                format!("only leaves can be set, this is a {}", node.kind.name()),
            ));
        }
        let value = value.ok_or_else(|| missing_value(&path))?;
        self.ensure_ancestors(tree, &path);
        tree.insert(StoredNode::leaf(path, value));
        Ok(())
    }

    fn create(
        &self,
        tree: &mut DataTree,
        path: DataPath,
        node: &SchemaNode,
        value: Option<&str>,
    ) -> Result<(), RpcError> {
        let stored = match &node.kind {
            NodeKind::Container { presence: true } => StoredNode::container(path),
            NodeKind::List { .. } => StoredNode::list_entry(path),
            NodeKind::LeafList(_) => {
                let path = leaf_list_entry_path(path, node, value);
                let literal = path
                    .last()
                    .and_then(PathStep::leaf_list_value)
                    .ok_or_else(|| missing_value(&path))?
                    .to_string();
                StoredNode::leaf_list_entry(path, literal)
            }
            _ => return Err(not_an_entry(&path, node)),
        };
        self.ensure_ancestors(tree, &stored.path);
        let path = stored.path.clone();
        tree.create(stored).map_err(store_error)?;
        if node.is_list() {
            self.materialize_keys(tree, &path, node);
        }
        Ok(())
    }

    /// Create the list entries and presence containers `path` lies in.
    fn ensure_ancestors(&self, tree: &mut DataTree, path: &DataPath) {
        for len in 1..path.len() {
            let ancestor = path.prefix(len);
            if tree.contains(&ancestor) {
                continue;
            }
            let Some(node) = self.resolver.node_for(&ancestor) else {
                continue;
            };
            if node.is_list() {
                tree.insert(StoredNode::list_entry(ancestor.clone()));
                self.materialize_keys(tree, &ancestor, &node);
            } else if node.is_presence_container() {
                tree.insert(StoredNode::container(ancestor));
            }
        }
    }

    /// Store the key leaves of a list entry from its predicates, in
    /// canonical form where the key type allows it.
    fn materialize_keys(&self, tree: &mut DataTree, entry: &DataPath, list: &SchemaNode) {
        let Some(step) = entry.last() else {
            return;
        };
        for key in list.keys() {
            let Some(value) = step.key(key) else {
                continue;
            };
            let key_path = entry.child(PathStep::qualified(list.module.clone(), key.clone()));
            let literal = self
                .resolver
                .node_for(&key_path)
                .and_then(|key_node| self.engine.decode(&key_node, value).ok())
                .map(|typed| self.engine.render(&typed))
                .unwrap_or_else(|| value.to_string());
            tree.insert(StoredNode::leaf(key_path, literal));
        }
    }
}

/// A leaf-list path with its `[.='v']` predicate, taken from `value` when
/// the path itself has none.
fn leaf_list_entry_path(mut path: DataPath, node: &SchemaNode, value: Option<&str>) -> DataPath {
    if !node.is_leaf_list() {
        return path;
    }
    if let (Some(value), Some(last)) = (value, path.steps_mut().last_mut()) {
        if last.predicates.is_empty() {
            last.predicates.push(Predicate::Value(value.to_string()));
        }
    }
    path
}

fn remove(tree: &mut DataTree, path: &DataPath) -> Result<(), RpcError> {
    tree.remove(path).map(|_| ()).map_err(store_error)
}

fn store_error(e: StoreError) -> RpcError {
    match e {
        StoreError::NotFound(path) => RpcError::data_missing(path),
        StoreError::AlreadyExists(path) => RpcError::data_exists(path),
    }
}

fn path_error(e: PathError) -> RpcError {
    let tag = match &e {
        PathError::Malformed { .. } => ErrorTag::InvalidValue,
        PathError::UnknownNode { .. } => ErrorTag::UnknownElement,
        PathError::AmbiguousList { .. } => ErrorTag::MissingElement,
    };
    RpcError::new(ErrorType::Application, tag, e.to_string()).at(e.path())
}

fn missing_value(path: &DataPath) -> RpcError {
    RpcError::new(ErrorType::Application, ErrorTag::MissingElement, "a value is required")
        .at(path.to_string())
}

fn not_an_entry(path: &DataPath, node: &SchemaNode) -> RpcError {
    RpcError::invalid_value(
        path.to_string(),
        format!("a {} cannot be created or removed as an entry", node.kind.name()),
    )
}
