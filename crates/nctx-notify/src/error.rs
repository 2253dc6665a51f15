use nctx_types::PathError;

/// Errors produced by the subscription bridge.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The subscription subtree is not a valid path.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The subscription was cancelled or its feed shut down.
    #[error("subscription closed")]
    Closed,
}

pub type NotifyResult<T> = Result<T, NotifyError>;
