use std::fmt;

use chrono::{DateTime, Utc};
use nctx_types::TypedValue;
use serde::{Deserialize, Serialize};

/// How a node changed in a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// One changed node as the backend reports it: canonical data path plus
/// lexical values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    pub path: String,
    pub operation: ChangeOperation,
    pub old_literal: Option<String>,
    pub new_literal: Option<String>,
}

impl RawChange {
    pub fn created(path: impl Into<String>, literal: Option<String>) -> Self {
        Self {
            path: path.into(),
            operation: ChangeOperation::Created,
            old_literal: None,
            new_literal: literal,
        }
    }

    pub fn modified(path: impl Into<String>, old: Option<String>, new: Option<String>) -> Self {
        Self {
            path: path.into(),
            operation: ChangeOperation::Modified,
            old_literal: old,
            new_literal: new,
        }
    }

    pub fn deleted(path: impl Into<String>, literal: Option<String>) -> Self {
        Self {
            path: path.into(),
            operation: ChangeOperation::Deleted,
            old_literal: literal,
            new_literal: None,
        }
    }
}

/// Everything one commit changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Position in the feed, starting at 1.
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    /// Backend session that made the commit.
    pub session_id: u32,
    pub changes: Vec<RawChange>,
}

/// A typed change delivered to a subscriber.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Sequence of the batch this change came from.
    pub sequence: u64,
    pub session_id: u32,
    pub committed_at: DateTime<Utc>,
    /// Canonical data path of the changed node.
    pub path: String,
    pub operation: ChangeOperation,
    /// `None` for nodes without a value (containers, list entries) and for
    /// the absent side of a creation or deletion.
    pub old_value: Option<TypedValue>,
    pub new_value: Option<TypedValue>,
}
