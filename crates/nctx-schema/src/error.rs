//! Error types for schema construction.

/// Errors raised while populating a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The node path is not a plain, module-qualified schema path.
    #[error("invalid schema path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The path names a module that was never added.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// The parent of the node has not been added yet.
    #[error("parent of '{0}' does not exist")]
    MissingParent(String),

    /// The parent exists but cannot have children.
    #[error("'{path}' cannot be placed under a {parent_kind}")]
    InvalidParent { path: String, parent_kind: String },

    /// A node with the same schema path already exists.
    #[error("duplicate schema node: {0}")]
    DuplicateNode(String),
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
