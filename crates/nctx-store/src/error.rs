/// Errors from data tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Nothing is stored at or below the path.
    #[error("data node doesn't exist: {0}")]
    NotFound(String),

    /// A node is already stored at the path.
    #[error("data node already exists: {0}")]
    AlreadyExists(String),
}

/// Result alias for data tree operations.
pub type StoreResult<T> = Result<T, StoreError>;
