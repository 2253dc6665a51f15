//! Pending edits and their payloads.

use std::fmt;

use nctx_coerce::render;
use nctx_types::{DataPath, MovePosition, TypedValue};
use serde::{Deserialize, Serialize};

/// What a pending edit does to its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditOperation {
    /// Create or replace a leaf value.
    Set,
    /// Create a presence container.
    Create,
    /// Remove a node and everything below it.
    Delete,
    /// Create a list entry or leaf-list entry.
    CreateListEntry,
    /// Remove a list entry or leaf-list entry.
    RemoveListEntry,
    /// Reorder an entry of a user-ordered list or leaf-list.
    Move,
}

impl EditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::CreateListEntry => "create-list-entry",
            Self::RemoveListEntry => "remove-list-entry",
            Self::Move => "move",
        }
    }

    /// Returns `true` for operations that remove data.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Delete | Self::RemoveListEntry)
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a staged edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagedValue {
    /// Coerced locally; satisfies every check local validation can make.
    Typed(TypedValue),
    /// Local coercion failed in a way the backend is left to judge at
    /// commit time. `literal` is what will be sent.
    Deferred { literal: String, reason: String },
}

impl StagedValue {
    pub fn absent() -> Self {
        Self::Typed(TypedValue::Absent)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    /// The typed value, unless validation was deferred.
    pub fn typed(&self) -> Option<&TypedValue> {
        match self {
            Self::Typed(value) => Some(value),
            Self::Deferred { .. } => None,
        }
    }

    /// Text sent to the backend; `None` when there is no payload.
    pub fn literal(&self) -> Option<String> {
        match self {
            Self::Typed(TypedValue::Absent) => None,
            Self::Typed(value) => Some(render(value)),
            Self::Deferred { literal, .. } => Some(literal.clone()),
        }
    }
}

impl From<TypedValue> for StagedValue {
    fn from(value: TypedValue) -> Self {
        Self::Typed(value)
    }
}

/// One staged write: a concrete path, an operation, and its payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub path: DataPath,
    pub operation: EditOperation,
    pub value: StagedValue,
    /// Where a `Move` puts the entry; `None` for every other operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<MovePosition>,
}

impl PendingEdit {
    pub fn new(path: DataPath, operation: EditOperation, value: StagedValue) -> Self {
        Self {
            path,
            operation,
            value,
            position: None,
        }
    }

    pub fn set(path: DataPath, value: impl Into<StagedValue>) -> Self {
        Self::new(path, EditOperation::Set, value.into())
    }

    pub fn create(path: DataPath) -> Self {
        Self::new(path, EditOperation::Create, StagedValue::absent())
    }

    pub fn delete(path: DataPath) -> Self {
        Self::new(path, EditOperation::Delete, StagedValue::absent())
    }

    /// `value` carries the entry value for leaf-lists and is absent for
    /// list entries, whose identity lives in the key predicates.
    pub fn create_list_entry(path: DataPath, value: impl Into<StagedValue>) -> Self {
        Self::new(path, EditOperation::CreateListEntry, value.into())
    }

    pub fn remove_list_entry(path: DataPath) -> Self {
        Self::new(path, EditOperation::RemoveListEntry, StagedValue::absent())
    }

    /// Reorder the list or leaf-list entry at `path`.
    pub fn move_entry(path: DataPath, position: MovePosition) -> Self {
        Self {
            position: Some(position),
            ..Self::new(path, EditOperation::Move, StagedValue::absent())
        }
    }

    /// The buffer key: canonical text of the path. Moves get a key of
    /// their own so that creating an entry and placing it are two edits.
    pub fn key(&self) -> String {
        match self.operation {
            EditOperation::Move => format!("move {}", self.path),
            _ => self.path.to_string(),
        }
    }
}

impl fmt::Display for PendingEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.path)?;
        if let Some(position) = &self.position {
            write!(f, " {position}")?;
        }
        if let Some(literal) = self.value.literal() {
            write!(f, " = {literal:?}")?;
        }
        Ok(())
    }
}
