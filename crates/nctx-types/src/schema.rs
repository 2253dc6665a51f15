//! Schema node metadata as consulted by the resolver and the coercion engine.
//!
//! Nodes are built once by a schema oracle and never mutated afterwards;
//! everything downstream holds them behind `Arc`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Inclusive interval of a `range` restriction.
///
/// For `decimal64` leaves the bounds are scaled by the leaf's fraction
/// digits, so `range "0.5 .. 2.5"` with two digits is `50..=250`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInterval {
    pub min: i128,
    pub max: i128,
}

impl RangeInterval {
    pub fn contains(&self, value: i128) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Inclusive interval of a `length` restriction (characters or bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthInterval {
    pub min: u64,
    pub max: u64,
}

impl LengthInterval {
    pub fn contains(&self, length: u64) -> bool {
        self.min <= length && length <= self.max
    }
}

/// Value restrictions attached to a leaf type. Empty vectors mean
/// unrestricted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Allowed value intervals; a value must fall in at least one.
    pub range: Vec<RangeInterval>,
    /// Allowed length intervals; a value must fall in at least one.
    pub length: Vec<LengthInterval>,
    /// XSD-style patterns, implicitly anchored. A value must match all.
    pub patterns: Vec<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.range.is_empty() && self.length.is_empty() && self.patterns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LeafType / TypeInfo
// ---------------------------------------------------------------------------

/// A YANG identity, qualified by its defining module.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub module: String,
    pub name: String,
}

impl Identity {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// The declared (resolved) type of a leaf or leaf-list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafType {
    String,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal { fraction_digits: u8 },
    Enumeration(BTreeSet<String>),
    Binary,
    Empty,
    /// Identities a value may name (the base identity's derived set).
    IdentityRef(BTreeSet<Identity>),
    Bits(BTreeSet<String>),
    /// A reference to another leaf's value; `target` is a schema path.
    LeafRef {
        target: String,
        target_type: Box<TypeInfo>,
    },
    /// Member types, tried in declaration order.
    Union(Vec<TypeInfo>),
}

impl LeafType {
    /// YANG built-in type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Decimal { .. } => "decimal64",
            Self::Enumeration(_) => "enumeration",
            Self::Binary => "binary",
            Self::Empty => "empty",
            Self::IdentityRef(_) => "identityref",
            Self::Bits(_) => "bits",
            Self::LeafRef { .. } => "leafref",
            Self::Union(_) => "union",
        }
    }

    /// Inclusive value bounds for the integer types.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        match self {
            Self::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::Uint8 => Some((0, u8::MAX as i128)),
            Self::Uint16 => Some((0, u16::MAX as i128)),
            Self::Uint32 => Some((0, u32::MAX as i128)),
            Self::Uint64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.integer_bounds().is_some()
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A leaf type together with its restrictions and descriptive metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub leaf_type: LeafType,
    pub constraints: Constraints,
    pub units: Option<String>,
    pub description: Option<String>,
}

impl TypeInfo {
    pub fn new(leaf_type: LeafType) -> Self {
        Self {
            leaf_type,
            constraints: Constraints::default(),
            units: None,
            description: None,
        }
    }

    pub fn with_range(mut self, min: i128, max: i128) -> Self {
        self.constraints.range.push(RangeInterval { min, max });
        self
    }

    pub fn with_length(mut self, min: u64, max: u64) -> Self {
        self.constraints.length.push(LengthInterval { min, max });
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.patterns.push(pattern.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Enumeration over the given symbols.
    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(LeafType::Enumeration(
            symbols.into_iter().map(Into::into).collect(),
        ))
    }

    /// Leafref pointing at `target`, whose own type is `target_type`.
    pub fn leafref(target: impl Into<String>, target_type: TypeInfo) -> Self {
        Self::new(LeafType::LeafRef {
            target: target.into(),
            target_type: Box::new(target_type),
        })
    }
}

// ---------------------------------------------------------------------------
// SchemaNode
// ---------------------------------------------------------------------------

/// Type and default of a leaf or leaf-list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafInfo {
    pub type_info: TypeInfo,
    pub default: Option<String>,
}

impl From<TypeInfo> for LeafInfo {
    fn from(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            default: None,
        }
    }
}

/// Structural role of a schema node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Container { presence: bool },
    List { keys: Vec<String> },
    Leaf(LeafInfo),
    LeafList(LeafInfo),
    /// An RPC, or an action when nested in data. Its parameters live in
    /// `input` and `output` child containers.
    Operation,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container { presence: true } => "presence container",
            Self::Container { presence: false } => "container",
            Self::List { .. } => "list",
            Self::Leaf(_) => "leaf",
            Self::LeafList(_) => "leaf-list",
            Self::Operation => "operation",
        }
    }
}

/// One node of the loaded schema tree.
///
/// `path` is the canonical schema path with a module prefix on every step,
/// e.g. `/example-schema:person/example-schema:name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub path: String,
    pub module: String,
    pub name: String,
    pub kind: NodeKind,
    /// `false` for state data (`config false`), which cannot be edited.
    pub config: bool,
    pub description: Option<String>,
    /// `ordered-by user` on a list or leaf-list: entries keep the order
    /// clients give them and can be moved.
    #[serde(default)]
    pub user_ordered: bool,
}

impl SchemaNode {
    /// Type information for leaves and leaf-lists.
    pub fn type_info(&self) -> Option<&TypeInfo> {
        match &self.kind {
            NodeKind::Leaf(info) | NodeKind::LeafList(info) => Some(&info.type_info),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_leaf_list(&self) -> bool {
        matches!(self.kind, NodeKind::LeafList(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List { .. })
    }

    pub fn is_operation(&self) -> bool {
        matches!(self.kind, NodeKind::Operation)
    }

    pub fn is_presence_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container { presence: true })
    }

    /// Returns `true` for lists and leaf-lists whose entries can be moved.
    pub fn is_user_ordered(&self) -> bool {
        self.user_ordered && (self.is_list() || self.is_leaf_list())
    }

    /// Key leaf names, empty unless this is a list.
    pub fn keys(&self) -> &[String] {
        match &self.kind {
            NodeKind::List { keys } => keys,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(type_info: TypeInfo) -> SchemaNode {
        SchemaNode {
            path: "/m:leaf".into(),
            module: "m".into(),
            name: "leaf".into(),
            kind: NodeKind::Leaf(type_info.into()),
            config: true,
            description: None,
            user_ordered: false,
        }
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(LeafType::Uint16.integer_bounds(), Some((0, 65535)));
        assert_eq!(LeafType::Int8.integer_bounds(), Some((-128, 127)));
        assert_eq!(LeafType::String.integer_bounds(), None);
        assert!(LeafType::Uint64.is_integer());
    }

    #[test]
    fn type_info_builder() {
        let info = TypeInfo::new(LeafType::String)
            .with_length(1, 8)
            .with_pattern("[a-z]+")
            .with_units("chars");
        assert_eq!(info.constraints.length, vec![LengthInterval { min: 1, max: 8 }]);
        assert_eq!(info.constraints.patterns, vec!["[a-z]+".to_string()]);
        assert_eq!(info.units.as_deref(), Some("chars"));
        assert!(!info.constraints.is_empty());
    }

    #[test]
    fn node_accessors() {
        let node = leaf(TypeInfo::enumeration(["lol", "coze"]));
        assert!(node.is_leaf());
        assert!(!node.is_list());
        assert!(node.keys().is_empty());
        assert_eq!(node.type_info().unwrap().leaf_type.name(), "enumeration");
        assert_eq!(node.kind.name(), "leaf");
    }

    #[test]
    fn leafref_boxes_target_type() {
        let info = TypeInfo::leafref("/m:person/name", TypeInfo::new(LeafType::String));
        match info.leaf_type {
            LeafType::LeafRef { target, target_type } => {
                assert_eq!(target, "/m:person/name");
                assert_eq!(target_type.leaf_type, LeafType::String);
            }
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn intervals() {
        assert!(RangeInterval { min: 60, max: 600 }.contains(599));
        assert!(!RangeInterval { min: 60, max: 600 }.contains(59));
        assert!(LengthInterval { min: 0, max: 0 }.contains(0));
    }

    #[test]
    fn identity_display() {
        assert_eq!(Identity::new("m", "fruit").to_string(), "m:fruit");
    }
}
