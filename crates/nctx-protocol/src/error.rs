use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedEndpoint(String),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unexpected reply to {request}: {got}")]
    UnexpectedReply { request: &'static str, got: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
