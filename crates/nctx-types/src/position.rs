//! Where a moved entry of a user-ordered list or leaf-list lands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::{DataPath, PathStep, Predicate};

/// Target position of a move.
///
/// Relative positions name their sibling by the predicates that address it:
/// key predicates for a list entry, a single `[.='v']` for a leaf-list
/// entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "insert", content = "anchor", rename_all = "kebab-case")]
pub enum MovePosition {
    First,
    Last,
    Before(Vec<Predicate>),
    After(Vec<Predicate>),
}

impl MovePosition {
    /// Before the list entry whose key `name` is `value`.
    pub fn before_key(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Before(vec![Predicate::Key {
            name: name.into(),
            value: value.into(),
        }])
    }

    /// After the list entry whose key `name` is `value`.
    pub fn after_key(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::After(vec![Predicate::Key {
            name: name.into(),
            value: value.into(),
        }])
    }

    /// Before the leaf-list entry holding `value`.
    pub fn before_value(value: impl Into<String>) -> Self {
        Self::Before(vec![Predicate::Value(value.into())])
    }

    /// After the leaf-list entry holding `value`.
    pub fn after_value(value: impl Into<String>) -> Self {
        Self::After(vec![Predicate::Value(value.into())])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Before(_) => "before",
            Self::After(_) => "after",
        }
    }

    /// Predicates of the sibling a relative move is anchored on.
    pub fn anchor(&self) -> Option<&[Predicate]> {
        match self {
            Self::First | Self::Last => None,
            Self::Before(anchor) | Self::After(anchor) => Some(anchor),
        }
    }

    /// The same position with its anchor replaced.
    pub fn with_anchor(&self, anchor: Vec<Predicate>) -> Self {
        match self {
            Self::First => Self::First,
            Self::Last => Self::Last,
            Self::Before(_) => Self::Before(anchor),
            Self::After(_) => Self::After(anchor),
        }
    }

    /// Path of the anchoring sibling of `entry`, if the move is relative.
    pub fn anchor_path(&self, entry: &DataPath) -> Option<DataPath> {
        let anchor = self.anchor()?;
        let parent = entry.parent()?;
        let last = entry.last()?;
        Some(parent.child(PathStep {
            module: last.module.clone(),
            name: last.name.clone(),
            predicates: anchor.to_vec(),
        }))
    }
}

impl fmt::Display for MovePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())?;
        for predicate in self.anchor().unwrap_or_default() {
            match predicate {
                Predicate::Key { name, value } => write!(f, " [{name}='{value}']")?,
                Predicate::Value(value) => write!(f, " [.='{value}']")?,
            }
        }
        Ok(())
    }
}
