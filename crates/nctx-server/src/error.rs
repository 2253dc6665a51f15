use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("schema error: {0}")]
    Schema(#[from] nctx_schema::SchemaError),

    #[error("protocol error: {0}")]
    Protocol(#[from] nctx_protocol::ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
