use thiserror::Error;

/// A value could not be coerced to a leaf's declared type.
///
/// Every variant names the schema path of the leaf and the declared type,
/// so a rejected edit is always attributable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The caller's value kind has no coercion path to the declared type.
    #[error("{path}: a {found} value cannot be stored in a {expected} node")]
    IncompatibleKind {
        path: String,
        expected: String,
        found: String,
    },

    /// Text could not be parsed as the declared type.
    #[error("{path}: '{literal}' is not a valid {expected} ({reason})")]
    UnparsableLiteral {
        path: String,
        expected: String,
        literal: String,
        reason: String,
    },

    /// The value has the right kind but lies outside the allowed values.
    #[error("{path}: {value} is not allowed for {expected} ({reason})")]
    ConstraintViolation {
        path: String,
        expected: String,
        value: String,
        reason: String,
    },
}

impl TypeError {
    pub fn incompatible(path: &str, expected: &str, found: &str) -> Self {
        Self::IncompatibleKind {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn unparsable(path: &str, expected: &str, literal: &str, reason: impl Into<String>) -> Self {
        Self::UnparsableLiteral {
            path: path.to_string(),
            expected: expected.to_string(),
            literal: literal.to_string(),
            reason: reason.into(),
        }
    }

    pub fn violation(path: &str, expected: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            path: path.to_string(),
            expected: expected.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Schema path of the leaf the value was meant for.
    pub fn path(&self) -> &str {
        match self {
            Self::IncompatibleKind { path, .. }
            | Self::UnparsableLiteral { path, .. }
            | Self::ConstraintViolation { path, .. } => path,
        }
    }

    /// Returns `true` for kind mismatches, which no backend could accept.
    pub fn is_incompatible_kind(&self) -> bool {
        matches!(self, Self::IncompatibleKind { .. })
    }
}

/// Convenience alias for coercion results.
pub type CoerceResult<T> = Result<T, TypeError>;
