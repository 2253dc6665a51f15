//! Error types for the transaction buffer.

/// Errors that can occur while staging edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxnError {
    /// The edit does not address one concrete node.
    #[error("invalid edit path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Convenience alias for buffer results.
pub type TxnResult<T> = Result<T, TxnError>;
