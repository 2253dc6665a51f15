//! Path resolution: from an expression string to a schema-checked,
//! fully qualified [`DataPath`].

use std::fmt;
use std::sync::Arc;

use nctx_types::{DataPath, NodeKind, PathError, PathStep, Predicate, SchemaNode};

use crate::oracle::SchemaOracle;

/// The outcome of resolving a path expression.
#[derive(Clone, Debug)]
pub struct ResolvedPath {
    /// The expression with every step module-qualified and list keys in
    /// schema order.
    pub path: DataPath,
    /// The addressed schema node; `None` for the root and for wildcards.
    pub node: Option<Arc<SchemaNode>>,
}

impl ResolvedPath {
    /// Canonical text of the resolved path.
    pub fn canonical(&self) -> String {
        self.path.to_string()
    }

    pub fn schema_path(&self) -> String {
        self.path.schema_path()
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Edits: one concrete node, every list fully keyed.
    Strict,
    /// Reads and subscriptions: root, partial keys and a trailing `*`.
    Query,
}

/// Validates path expressions against a [`SchemaOracle`].
///
/// Resolution has no side effects; a resolver is cheap to clone and safe to
/// share between tasks.
#[derive(Clone)]
pub struct PathResolver {
    oracle: Arc<dyn SchemaOracle>,
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("modules", &self.oracle.modules())
            .finish()
    }
}

impl PathResolver {
    pub fn new(oracle: Arc<dyn SchemaOracle>) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &Arc<dyn SchemaOracle> {
        &self.oracle
    }

    /// Resolve an edit target.
    ///
    /// Fails with `Malformed` on bad syntax, wildcards or misplaced
    /// predicates, `UnknownNode` if any step is missing from the schema, and
    /// `AmbiguousList` if a list step lacks any of its keys.
    pub fn resolve(&self, expr: &str) -> Result<ResolvedPath, PathError> {
        let parsed = DataPath::parse(expr)?;
        self.walk(expr, &parsed, Mode::Strict)
    }

    /// Resolve a read or subscription target. Accepts `/`, list steps with
    /// partial or no keys, and a trailing wildcard step (`/module:*`).
    pub fn resolve_query(&self, expr: &str) -> Result<ResolvedPath, PathError> {
        let parsed = DataPath::parse(expr)?;
        self.walk(expr, &parsed, Mode::Query)
    }

    /// Strictly resolve an already parsed path.
    pub fn resolve_data_path(&self, path: &DataPath) -> Result<ResolvedPath, PathError> {
        self.walk(&path.to_string(), path, Mode::Strict)
    }

    /// Schema node of a concrete data path, without predicate checks.
    pub fn node_for(&self, path: &DataPath) -> Option<Arc<SchemaNode>> {
        if path.is_root() || path.has_wildcard() {
            return None;
        }
        self.oracle.node(&path.schema_path())
    }

    /// Returns `true` if `node` is a key leaf of its parent list.
    pub fn is_list_key(&self, node: &SchemaNode) -> bool {
        self.oracle.is_list_key(node)
    }

    fn walk(&self, expr: &str, parsed: &DataPath, mode: Mode) -> Result<ResolvedPath, PathError> {
        if parsed.is_root() {
            return match mode {
                Mode::Strict => Err(PathError::malformed(expr, "the root is not an editable node")),
                Mode::Query => Ok(ResolvedPath {
                    path: DataPath::root(),
                    node: None,
                }),
            };
        }

        let mut steps = Vec::with_capacity(parsed.len());
        let mut parent_path = String::new();
        let mut current_module: Option<&str> = None;
        let mut node: Option<Arc<SchemaNode>> = None;
        let last = parsed.len() - 1;

        for (i, step) in parsed.steps().iter().enumerate() {
            let module = step
                .module
                .as_deref()
                .or(current_module)
                .ok_or_else(|| PathError::malformed(expr, "the first step must be module-qualified"))?;
            if !self.oracle.has_module(module) {
                return Err(PathError::UnknownNode {
                    path: expr.to_string(),
                    node: module.to_string(),
                });
            }

            if step.is_wildcard() {
                if mode == Mode::Strict {
                    return Err(PathError::malformed(expr, "wildcards are only allowed in queries"));
                }
                if i != last {
                    return Err(PathError::malformed(expr, "a wildcard must be the last step"));
                }
                steps.push(PathStep::qualified(module, PathStep::WILDCARD));
                node = None;
                break;
            }

            let schema_path = format!("{parent_path}/{module}:{}", step.name);
            let found = self.oracle.node(&schema_path).ok_or_else(|| PathError::UnknownNode {
                path: expr.to_string(),
                node: schema_path.clone(),
            })?;
            let predicates = check_predicates(expr, &found, step, mode)?;

            steps.push(PathStep {
                module: Some(module.to_string()),
                name: step.name.clone(),
                predicates,
            });
            parent_path = schema_path;
            current_module = Some(module);
            node = Some(found);
        }

        Ok(ResolvedPath {
            path: DataPath::from_steps(steps),
            node,
        })
    }
}

/// Validate the predicates of one step and return them in canonical order.
fn check_predicates(
    expr: &str,
    node: &SchemaNode,
    step: &PathStep,
    mode: Mode,
) -> Result<Vec<Predicate>, PathError> {
    match &node.kind {
        NodeKind::List { keys } => {
            let mut seen: Vec<&str> = Vec::new();
            for predicate in &step.predicates {
                match predicate {
                    Predicate::Key { name, .. } => {
                        if !keys.contains(name) {
                            return Err(PathError::malformed(
                                expr,
                                format!("'{name}' is not a key of list '{}'", node.path),
                            ));
                        }
                        if seen.contains(&name.as_str()) {
                            return Err(PathError::malformed(
                                expr,
                                format!("key '{name}' given twice"),
                            ));
                        }
                        seen.push(name);
                    }
                    Predicate::Value(_) => {
                        return Err(PathError::malformed(
                            expr,
                            format!("list '{}' is addressed by key predicates", node.path),
                        ))
                    }
                }
            }

            let mut ordered = Vec::with_capacity(keys.len());
            let mut missing = Vec::new();
            for key in keys {
                match step.key(key) {
                    Some(value) => ordered.push(Predicate::Key {
                        name: key.clone(),
                        value: value.to_string(),
                    }),
                    None => missing.push(key.clone()),
                }
            }
            if mode == Mode::Strict && !missing.is_empty() {
                return Err(PathError::AmbiguousList {
                    path: expr.to_string(),
                    list: node.path.clone(),
                    missing,
                });
            }
            Ok(ordered)
        }
        NodeKind::LeafList(_) => match step.predicates.as_slice() {
            [] | [Predicate::Value(_)] => Ok(step.predicates.clone()),
            _ => Err(PathError::malformed(
                expr,
                format!("leaf-list '{}' takes a single [.='value'] predicate", node.path),
            )),
        },
        kind => {
            if step.predicates.is_empty() {
                Ok(Vec::new())
            } else {
                Err(PathError::malformed(
                    expr,
                    format!("'{}' is a {} and cannot carry predicates", node.path, kind.name()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticSchema;
    use nctx_types::{LeafType, TypeInfo};

    fn resolver() -> PathResolver {
        let mut s = StaticSchema::new();
        s.add_module("example-schema").add_module("other");
        s.add_container("/example-schema:a", false).unwrap();
        s.add_leaf("/example-schema:a/leafInA", TypeInfo::new(LeafType::String)).unwrap();
        s.add_list("/example-schema:multi", &["first", "second"]).unwrap();
        s.add_leaf("/example-schema:multi/first", TypeInfo::new(LeafType::String)).unwrap();
        s.add_leaf("/example-schema:multi/second", TypeInfo::new(LeafType::Int32)).unwrap();
        s.add_leaf("/example-schema:multi/note", TypeInfo::new(LeafType::String)).unwrap();
        s.add_leaf_list("/example-schema:addresses", TypeInfo::new(LeafType::String)).unwrap();
        s.add_leaf("/other:top", TypeInfo::new(LeafType::Bool)).unwrap();
        PathResolver::new(Arc::new(s))
    }

    #[test]
    fn resolves_leaf_and_qualifies_steps() {
        let r = resolver().resolve("/example-schema:a/leafInA").unwrap();
        assert_eq!(r.node.as_ref().unwrap().name, "leafInA");
        assert_eq!(r.canonical(), "/example-schema:a/leafInA");
        assert_eq!(r.path.steps()[1].module.as_deref(), Some("example-schema"));
        assert_eq!(r.schema_path(), "/example-schema:a/example-schema:leafInA");
    }

    #[test]
    fn list_keys_are_reordered_to_schema_order() {
        let r = resolver()
            .resolve("/example-schema:multi[second='2'][first='x']/note")
            .unwrap();
        assert_eq!(r.canonical(), "/example-schema:multi[first='x'][second='2']/note");
    }

    #[test]
    fn missing_keys_are_ambiguous_for_edits() {
        let err = resolver()
            .resolve("/example-schema:multi[first='x']/note")
            .unwrap_err();
        assert_eq!(
            err,
            PathError::AmbiguousList {
                path: "/example-schema:multi[first='x']/note".into(),
                list: "/example-schema:multi".into(),
                missing: vec!["second".into()],
            }
        );
    }

    #[test]
    fn queries_accept_partial_keys_and_wildcards() {
        let r = resolver();
        let q = r.resolve_query("/example-schema:multi[first='x']").unwrap();
        assert!(q.node.unwrap().is_list());

        let q = r.resolve_query("/example-schema:*").unwrap();
        assert!(q.node.is_none());
        assert_eq!(q.canonical(), "/example-schema:*");

        let q = r.resolve_query("/").unwrap();
        assert!(q.path.is_root());
    }

    #[test]
    fn unknown_nodes_and_modules() {
        let r = resolver();
        assert!(matches!(
            r.resolve("/example-schema:nope"),
            Err(PathError::UnknownNode { node, .. }) if node == "/example-schema:nope"
        ));
        assert!(matches!(
            r.resolve("/missing:a"),
            Err(PathError::UnknownNode { node, .. }) if node == "missing"
        ));
        assert!(matches!(
            r.resolve("/example-schema:a/leafInA/deeper"),
            Err(PathError::UnknownNode { .. })
        ));
    }

    #[test]
    fn malformed_cases() {
        let r = resolver();
        let cases = [
            "a/leafInA",
            "/a/leafInA",
            "/",
            "/example-schema:*",
            "/example-schema:a[x='1']",
            "/example-schema:multi[first='x'][second='1'][note='n']",
            "/example-schema:multi[first='x'][first='y'][second='1']",
            "/example-schema:multi[.='x']",
            "/example-schema:addresses[name='x']",
        ];
        for expr in cases {
            assert!(
                matches!(r.resolve(expr), Err(PathError::Malformed { .. })),
                "expected {expr} to be malformed"
            );
        }
        assert!(matches!(
            r.resolve_query("/example-schema:*/leafInA"),
            Err(PathError::Malformed { .. })
        ));
    }

    #[test]
    fn leaf_list_entries() {
        let r = resolver();
        let entry = r.resolve("/example-schema:addresses[.='0.0.0.0']").unwrap();
        assert_eq!(entry.path.last().unwrap().leaf_list_value(), Some("0.0.0.0"));
        let whole = r.resolve("/example-schema:addresses").unwrap();
        assert!(whole.node.unwrap().is_leaf_list());
    }

    #[test]
    fn node_for_concrete_paths() {
        let r = resolver();
        let path = DataPath::parse("/example-schema:multi[first='x'][second='1']/note").unwrap();
        assert_eq!(r.node_for(&path).unwrap().name, "note");
        assert!(r.node_for(&DataPath::root()).is_none());
        assert!(r.resolve_data_path(&path).is_ok());
    }

    #[test]
    fn key_detection() {
        let r = resolver();
        let first = r.resolve("/example-schema:multi[first='x'][second='1']/first").unwrap();
        assert!(r.is_list_key(first.node.as_ref().unwrap()));
        let note = r.resolve("/example-schema:multi[first='x'][second='1']/note").unwrap();
        assert!(!r.is_list_key(note.node.as_ref().unwrap()));
    }
}
