use nctx_store::{DataTree, StoredKind, StoredNode};
use nctx_types::{NodeKind, PathStep, SchemaNode};

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, Violation};

/// Tree shape stage.
///
/// - every stored node matches the kind of its schema node
/// - list entries carry all their key leaves, equal to the path predicates
/// - leaf-list entries hold the value named by their predicate
/// - enclosing list entries and presence containers exist
pub struct StructureStage;

impl GateStage for StructureStage {
    fn name(&self) -> &str {
        "structure"
    }

    fn evaluate(
        &self,
        tree: &DataTree,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let mut found = Vec::new();

        for stored in tree.iter() {
            if context.is_saturated(&found) {
                break;
            }
            let Some(node) = context.resolver.node_for(&stored.path) else {
                found.push(Violation::new(self.name(), stored.key(), "no such node in the schema"));
                continue;
            };
            if let Err(message) = check_kind(stored, &node) {
                found.push(Violation::new(self.name(), stored.key(), message));
                continue;
            }
            match stored.kind {
                StoredKind::ListEntry => self.check_keys(tree, stored, &node, context, &mut found),
                StoredKind::LeafListEntry => {
                    let predicate = stored.path.last().and_then(PathStep::leaf_list_value);
                    if !same_value(context, &node, predicate, stored.literal.as_deref()) {
                        found.push(Violation::new(
                            self.name(),
                            stored.key(),
                            "leaf-list value differs from its predicate",
                        ));
                    }
                }
                StoredKind::Leaf | StoredKind::Container => {}
            }
            self.check_ancestors(tree, stored, context, &mut found);
        }

        found.truncate(context.config.max_violations);
        Ok(StageDecision::from_violations(found))
    }
}

impl StructureStage {
    fn check_keys(
        &self,
        tree: &DataTree,
        entry: &StoredNode,
        list: &SchemaNode,
        context: &GateContext<'_>,
        found: &mut Vec<Violation>,
    ) {
        let Some(step) = entry.path.last() else {
            return;
        };
        for key in list.keys() {
            let key_path = entry.path.child(PathStep::qualified(list.module.clone(), key.clone()));
            let Some(key_node) = context.resolver.node_for(&key_path) else {
                found.push(Violation::new(self.name(), entry.key(), format!("key '{key}' has no schema node")));
                continue;
            };
            let stored = tree.get(&key_path).and_then(|n| n.literal.as_deref());
            if stored.is_none() {
                found.push(Violation::new(self.name(), entry.key(), format!("missing key leaf '{key}'")));
            } else if !same_value(context, &key_node, step.key(key), stored) {
                found.push(Violation::new(
                    self.name(),
                    entry.key(),
                    format!("key leaf '{key}' differs from the entry's predicate"),
                ));
            }
        }
    }

    fn check_ancestors(
        &self,
        tree: &DataTree,
        stored: &StoredNode,
        context: &GateContext<'_>,
        found: &mut Vec<Violation>,
    ) {
        for len in 1..stored.path.len() {
            let ancestor = stored.path.prefix(len);
            let Some(node) = context.resolver.node_for(&ancestor) else {
                continue;
            };
            let required = node.is_list() || node.is_presence_container();
            if required && !tree.contains(&ancestor) {
                found.push(Violation::new(
                    self.name(),
                    stored.key(),
                    format!("enclosing {} {ancestor} doesn't exist", node.kind.name()),
                ));
                // One report per node is enough.
                return;
            }
        }
    }
}

fn check_kind(stored: &StoredNode, node: &SchemaNode) -> Result<(), String> {
    let ok = match (&stored.kind, &node.kind) {
        (StoredKind::Container, NodeKind::Container { presence }) => *presence,
        (StoredKind::ListEntry, NodeKind::List { .. }) => true,
        (StoredKind::Leaf, NodeKind::Leaf(_)) => true,
        (StoredKind::LeafListEntry, NodeKind::LeafList(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("stored data doesn't fit a {}", node.kind.name()))
    }
}

/// Compare two lexical values under a node's type, so "07" equals "7"
/// for integer keys.
fn same_value(
    context: &GateContext<'_>,
    node: &SchemaNode,
    expected: Option<&str>,
    actual: Option<&str>,
) -> bool {
    match (expected, actual) {
        (Some(expected), Some(actual)) => {
            match (context.engine.decode(node, expected), context.engine.decode(node, actual)) {
                (Ok(a), Ok(b)) => a == b,
                _ => expected == actual,
            }
        }
        _ => false,
    }
}
