use nctx_types::DataPath;
use serde::{Deserialize, Serialize};

/// What kind of data a stored node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoredKind {
    /// A presence container.
    Container,
    /// One entry of a list; its keys are in the path predicates.
    ListEntry,
    Leaf,
    /// One value of a leaf-list.
    LeafListEntry,
}

/// One node of a data tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNode {
    pub path: DataPath,
    pub kind: StoredKind,
    /// Canonical lexical value; `None` for containers and list entries.
    pub literal: Option<String>,
}

impl StoredNode {
    pub fn container(path: DataPath) -> Self {
        Self {
            path,
            kind: StoredKind::Container,
            literal: None,
        }
    }

    pub fn list_entry(path: DataPath) -> Self {
        Self {
            path,
            kind: StoredKind::ListEntry,
            literal: None,
        }
    }

    pub fn leaf(path: DataPath, literal: impl Into<String>) -> Self {
        Self {
            path,
            kind: StoredKind::Leaf,
            literal: Some(literal.into()),
        }
    }

    pub fn leaf_list_entry(path: DataPath, literal: impl Into<String>) -> Self {
        Self {
            path,
            kind: StoredKind::LeafListEntry,
            literal: Some(literal.into()),
        }
    }

    /// Canonical text of the node's path.
    pub fn key(&self) -> String {
        self.path.to_string()
    }

    pub fn schema_path(&self) -> String {
        self.path.schema_path()
    }

    /// Returns `true` for list entries and leaf-list entries.
    pub fn is_entry(&self) -> bool {
        matches!(self.kind, StoredKind::ListEntry | StoredKind::LeafListEntry)
    }

    /// Returns `true` for leaves and leaf-list entries.
    pub fn has_value(&self) -> bool {
        matches!(self.kind, StoredKind::Leaf | StoredKind::LeafListEntry)
    }
}
