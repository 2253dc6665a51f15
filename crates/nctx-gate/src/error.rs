/// Failures of the gate itself.
///
/// A candidate that breaks the schema is not an error; it is a `Rejected`
/// decision carrying violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// A stage couldn't finish, e.g. a leafref whose target path doesn't
    /// resolve.
    #[error("stage '{stage}' failed: {message}")]
    StageError { stage: String, message: String },

    #[error("invalid gate configuration: {0}")]
    Config(String),
}

impl GateError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
