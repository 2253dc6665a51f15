//! The [`SchemaOracle`] trait: read-only access to the loaded schema tree.

use std::sync::Arc;

use nctx_types::SchemaNode;

/// Read-only lookup of schema metadata by canonical schema path.
///
/// Implementations must be `Send + Sync`: one oracle is shared by every
/// session, resolver, and subscription in the process, and none of them
/// take locks to read it. Schema paths carry a module prefix on every step
/// (`/example-schema:person/example-schema:name`); the root is `/`.
pub trait SchemaOracle: Send + Sync {
    /// Look up a node by schema path.
    fn node(&self, schema_path: &str) -> Option<Arc<SchemaNode>>;

    /// Direct children of a node, in the order they were defined.
    ///
    /// Pass `/` for the top-level nodes of all modules.
    fn children(&self, schema_path: &str) -> Vec<Arc<SchemaNode>>;

    /// Returns `true` if the module is loaded.
    fn has_module(&self, module: &str) -> bool;

    /// Names of all loaded modules.
    fn modules(&self) -> Vec<String>;

    /// The parent node, or `None` for top-level nodes.
    fn parent(&self, node: &SchemaNode) -> Option<Arc<SchemaNode>> {
        let (parent, _) = node.path.rsplit_once('/')?;
        if parent.is_empty() {
            None
        } else {
            self.node(parent)
        }
    }

    /// Returns `true` if `node` is a key leaf of its parent list.
    fn is_list_key(&self, node: &SchemaNode) -> bool {
        self.parent(node)
            .map(|parent| parent.keys().iter().any(|k| *k == node.name))
            .unwrap_or(false)
    }
}
