use thiserror::Error;

/// Errors produced while parsing or resolving a path expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The expression is not syntactically well-formed.
    #[error("malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// The expression names a node that does not exist in the schema.
    #[error("unknown node '{node}' in path '{path}'")]
    UnknownNode { path: String, node: String },

    /// A list step lacks one or more of its key predicates.
    #[error("list '{list}' in path '{path}' is missing key predicates: {}", missing.join(", "))]
    AmbiguousList {
        path: String,
        list: String,
        missing: Vec<String>,
    },
}

impl PathError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The path expression the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::Malformed { path, .. }
            | Self::UnknownNode { path, .. }
            | Self::AmbiguousList { path, .. } => path,
        }
    }
}

/// Errors produced by value operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("fraction digits must be between 1 and 18, got {0}")]
    InvalidFractionDigits(u8),

    #[error("invalid decimal literal '{0}'")]
    InvalidDecimal(String),

    #[error("'{literal}' needs more than {fraction_digits} fraction digits")]
    TooManyFractionDigits { literal: String, fraction_digits: u8 },

    #[error("decimal '{0}' does not fit in 64 bits")]
    DecimalOverflow(String),
}
