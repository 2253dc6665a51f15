use std::time::Duration;

use nctx_protocol::RpcError;
use thiserror::Error;

/// Why a commit didn't take effect. The staged edits are kept in every case.
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    #[error("commit rejected: {}", summarize(.0))]
    ValidationFailed(Vec<RpcError>),

    #[error("commit timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport lost during commit: {0}")]
    TransportLost(String),
}

impl CommitError {
    /// The backend's errors, for a validation failure.
    pub fn errors(&self) -> &[RpcError] {
        match self {
            Self::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("path error: {0}")]
    Path(#[from] nctx_types::PathError),

    #[error("type error: {0}")]
    Type(#[from] nctx_coerce::TypeError),

    #[error("transaction error: {0}")]
    Txn(#[from] nctx_txn::TxnError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport lost: {0}")]
    TransportLost(String),

    #[error("rejected by the backend: {}", summarize(.0))]
    Rejected(Vec<RpcError>),

    #[error("protocol error: {0}")]
    Protocol(#[from] nctx_protocol::ProtocolError),

    #[error("subscription error: {0}")]
    Notify(#[from] nctx_notify::NotifyError),

    #[error("session is closed")]
    Closed,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

fn summarize(errors: &[RpcError]) -> String {
    if errors.is_empty() {
        return "no details".into();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
