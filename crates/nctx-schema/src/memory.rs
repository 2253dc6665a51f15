//! In-memory schema populated node by node.
//!
//! [`StaticSchema`] is what tests and embedders use in place of a compiled
//! YANG module set. Nodes are added top-down with plain schema paths whose
//! first step is module-qualified:
//!
//! ```
//! use nctx_schema::{SchemaOracle, StaticSchema};
//! use nctx_types::{LeafType, TypeInfo};
//!
//! let mut schema = StaticSchema::new();
//! schema.add_module("example-schema");
//! schema.add_list("/example-schema:person", &["name"]).unwrap();
//! schema.add_leaf("/example-schema:person/name", TypeInfo::new(LeafType::String)).unwrap();
//!
//! assert!(schema.node("/example-schema:person/example-schema:name").is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nctx_types::{DataPath, LeafInfo, NodeKind, SchemaNode};

use crate::error::{SchemaError, SchemaResult};
use crate::oracle::SchemaOracle;

/// A schema oracle backed by in-memory maps.
///
/// Construction takes `&mut self`; once the schema is wrapped in an `Arc`
/// and handed to resolvers it is never mutated again, so lookups need no
/// locking.
#[derive(Debug, Default)]
pub struct StaticSchema {
    modules: BTreeSet<String>,
    nodes: BTreeMap<String, Arc<SchemaNode>>,
    children: BTreeMap<String, Vec<String>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of schema nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a module so its nodes can be added.
    pub fn add_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.modules.insert(name.into());
        self
    }

    pub fn add_container(&mut self, path: &str, presence: bool) -> SchemaResult<()> {
        self.insert(path, NodeKind::Container { presence }, true)
    }

    /// Add a list keyed by the given leaf names. The key leaves are added
    /// separately, like any other child.
    pub fn add_list(&mut self, path: &str, keys: &[&str]) -> SchemaResult<()> {
        let keys = keys.iter().map(|k| k.to_string()).collect();
        self.insert(path, NodeKind::List { keys }, true)
    }

    pub fn add_leaf(&mut self, path: &str, info: impl Into<LeafInfo>) -> SchemaResult<()> {
        self.insert(path, NodeKind::Leaf(info.into()), true)
    }

    /// Add a `config false` leaf (state data, read-only).
    pub fn add_state_leaf(&mut self, path: &str, info: impl Into<LeafInfo>) -> SchemaResult<()> {
        self.insert(path, NodeKind::Leaf(info.into()), false)
    }

    pub fn add_leaf_list(&mut self, path: &str, info: impl Into<LeafInfo>) -> SchemaResult<()> {
        self.insert(path, NodeKind::LeafList(info.into()), true)
    }

    /// Add an RPC (top level) or action (inside data) together with its
    /// empty `input` and `output` containers. Parameters are added below
    /// those with [`add_leaf`](Self::add_leaf); they are never
    /// configuration.
    pub fn add_operation(&mut self, path: &str) -> SchemaResult<()> {
        self.insert(path, NodeKind::Operation, false)?;
        self.insert(&format!("{path}/input"), NodeKind::Container { presence: false }, false)?;
        self.insert(&format!("{path}/output"), NodeKind::Container { presence: false }, false)
    }

    /// Mark an already added list or leaf-list `ordered-by user`.
    pub fn order_by_user(&mut self, path: &str) -> SchemaResult<()> {
        let invalid = |reason: &str| SchemaError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };
        let canonical = DataPath::parse(path)
            .map_err(|e| invalid(&e.to_string()))?
            .schema_path();
        let node = self
            .nodes
            .get_mut(&canonical)
            .ok_or_else(|| invalid("no such node"))?;
        if !matches!(node.kind, NodeKind::List { .. } | NodeKind::LeafList(_)) {
            return Err(invalid("only lists and leaf-lists have an order"));
        }
        Arc::make_mut(node).user_ordered = true;
        Ok(())
    }

    fn insert(&mut self, path: &str, kind: NodeKind, config: bool) -> SchemaResult<()> {
        let invalid = |reason: &str| SchemaError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let parsed = DataPath::parse(path).map_err(|e| invalid(&e.to_string()))?;
        let step = parsed.last().ok_or_else(|| invalid("the root cannot be redefined"))?;
        if parsed.has_wildcard() {
            return Err(invalid("wildcards are not allowed"));
        }
        if parsed.steps().iter().any(|s| !s.predicates.is_empty()) {
            return Err(invalid("predicates are not allowed"));
        }
        let module = parsed
            .module()
            .ok_or_else(|| invalid("the first step must be module-qualified"))?
            .to_string();
        if let Some(unknown) = parsed
            .effective_modules()
            .into_iter()
            .flatten()
            .find(|m| !self.modules.contains(*m))
        {
            return Err(SchemaError::UnknownModule(unknown.to_string()));
        }

        let canonical = parsed.schema_path();
        if self.nodes.contains_key(&canonical) {
            return Err(SchemaError::DuplicateNode(canonical));
        }

        let parent_path = parsed.parent().map(|p| p.schema_path()).unwrap_or_default();
        let mut config = config;
        if parent_path != "/" {
            let parent = self
                .nodes
                .get(&parent_path)
                .ok_or_else(|| SchemaError::MissingParent(canonical.clone()))?;
            if matches!(parent.kind, NodeKind::Leaf(_) | NodeKind::LeafList(_)) {
                return Err(SchemaError::InvalidParent {
                    path: canonical,
                    parent_kind: parent.kind.name().to_string(),
                });
            }
            // State data stays state data all the way down.
            config &= parent.config;
        }

        let node = SchemaNode {
            path: canonical.clone(),
            module,
            name: step.name.clone(),
            kind,
            config,
            description: None,
            user_ordered: false,
        };
        self.nodes.insert(canonical.clone(), Arc::new(node));
        self.children.entry(parent_path).or_default().push(canonical);
        Ok(())
    }
}

impl SchemaOracle for StaticSchema {
    fn node(&self, schema_path: &str) -> Option<Arc<SchemaNode>> {
        self.nodes.get(schema_path).cloned()
    }

    fn children(&self, schema_path: &str) -> Vec<Arc<SchemaNode>> {
        self.children
            .get(schema_path)
            .map(|paths| paths.iter().filter_map(|p| self.nodes.get(p).cloned()).collect())
            .unwrap_or_default()
    }

    fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    fn modules(&self) -> Vec<String> {
        self.modules.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nctx_types::{LeafType, TypeInfo};

    fn schema() -> StaticSchema {
        let mut s = StaticSchema::new();
        s.add_module("m").add_module("aug");
        s.add_container("/m:a", false).unwrap();
        s.add_leaf("/m:a/b", TypeInfo::new(LeafType::Bool)).unwrap();
        s.add_list("/m:person", &["name"]).unwrap();
        s.add_leaf("/m:person/name", TypeInfo::new(LeafType::String)).unwrap();
        s
    }

    #[test]
    fn nodes_are_stored_under_canonical_paths() {
        let s = schema();
        let node = s.node("/m:a/m:b").unwrap();
        assert_eq!(node.name, "b");
        assert_eq!(node.module, "m");
        assert!(node.config);
        assert!(s.node("/m:a/b").is_none());
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn children_keep_definition_order() {
        let s = schema();
        let top: Vec<_> = s.children("/").iter().map(|n| n.name.clone()).collect();
        assert_eq!(top, vec!["a", "person"]);
        assert_eq!(s.children("/m:a").len(), 1);
        assert!(s.children("/m:a/m:b").is_empty());
    }

    #[test]
    fn augmenting_module_prefix() {
        let mut s = schema();
        s.add_leaf("/m:a/aug:extra", TypeInfo::new(LeafType::Int8)).unwrap();
        let node = s.node("/m:a/aug:extra").unwrap();
        assert_eq!(node.module, "aug");
    }

    #[test]
    fn rejects_unknown_module() {
        let mut s = schema();
        assert_eq!(
            s.add_container("/nope:x", false),
            Err(SchemaError::UnknownModule("nope".into()))
        );
    }

    #[test]
    fn rejects_missing_parent_and_duplicates() {
        let mut s = schema();
        assert!(matches!(
            s.add_leaf("/m:missing/leaf", TypeInfo::new(LeafType::String)),
            Err(SchemaError::MissingParent(_))
        ));
        assert!(matches!(
            s.add_container("/m:a", true),
            Err(SchemaError::DuplicateNode(_))
        ));
    }

    #[test]
    fn rejects_children_of_leaves() {
        let mut s = schema();
        assert!(matches!(
            s.add_leaf("/m:a/b/c", TypeInfo::new(LeafType::String)),
            Err(SchemaError::InvalidParent { .. })
        ));
    }

    #[test]
    fn rejects_unqualified_and_patterned_paths() {
        let mut s = schema();
        for bad in ["/x", "/m:*", "/m:person[name='x']/y", "/"] {
            assert!(
                matches!(s.add_container(bad, false), Err(SchemaError::InvalidPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn operations_get_input_and_output() {
        let mut s = schema();
        s.add_operation("/m:reboot").unwrap();
        s.add_leaf("/m:reboot/input/delay", TypeInfo::new(LeafType::Uint32)).unwrap();
        s.add_operation("/m:person/poke").unwrap();

        assert!(s.node("/m:reboot").unwrap().is_operation());
        let delay = s.node("/m:reboot/m:input/m:delay").unwrap();
        assert!(!delay.config);
        assert!(s.node("/m:person/m:poke/m:output").is_some());
        let names: Vec<_> = s.children("/m:reboot").iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["input", "output"]);
    }

    #[test]
    fn lists_can_be_ordered_by_user() {
        let mut s = schema();
        assert!(!s.node("/m:person").unwrap().is_user_ordered());
        s.order_by_user("/m:person").unwrap();
        assert!(s.node("/m:person").unwrap().is_user_ordered());
        assert!(matches!(
            s.order_by_user("/m:a"),
            Err(SchemaError::InvalidPath { .. })
        ));
        assert!(matches!(
            s.order_by_user("/m:nope"),
            Err(SchemaError::InvalidPath { .. })
        ));
    }

    #[test]
    fn state_data_is_inherited() {
        let mut s = schema();
        s.add_container("/m:stats", false).unwrap();
        s.add_state_leaf("/m:stats/uptime", TypeInfo::new(LeafType::Uint32)).unwrap();
        assert!(!s.node("/m:stats/m:uptime").unwrap().config);
    }

    #[test]
    fn list_key_lookup() {
        let s = schema();
        let name = s.node("/m:person/m:name").unwrap();
        assert!(s.is_list_key(&name));
        let b = s.node("/m:a/m:b").unwrap();
        assert!(!s.is_list_key(&b));
        assert_eq!(s.parent(&b).unwrap().name, "a");
        assert!(s.parent(&s.node("/m:a").unwrap()).is_none());
    }
}
