//! Structured RPC errors, shaped after NETCONF `rpc-error`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Conceptual layer the error was raised in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    MissingElement,
    UnknownElement,
    AccessDenied,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InUse => "in-use",
            Self::InvalidValue => "invalid-value",
            Self::MissingElement => "missing-element",
            Self::UnknownElement => "unknown-element",
            Self::AccessDenied => "access-denied",
            Self::DataExists => "data-exists",
            Self::DataMissing => "data-missing",
            Self::OperationNotSupported => "operation-not-supported",
            Self::OperationFailed => "operation-failed",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    /// Data path of the offending node, if there is one.
    pub path: Option<String>,
    pub message: String,
}

impl RpcError {
    pub fn new(error_type: ErrorType, tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            error_type,
            tag,
            path: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn invalid_value(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::InvalidValue, message).at(path)
    }

    pub fn data_missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorType::Application, ErrorTag::DataMissing, format!("data node {path} doesn't exist"))
            .at(path)
    }

    pub fn data_exists(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorType::Application, ErrorTag::DataExists, format!("data node {path} already exists"))
            .at(path)
    }

    pub fn access_denied(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::AccessDenied, message).at(path)
    }

    pub fn unknown_element(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::UnknownElement, message).at(path)
    }

    pub fn operation_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::OperationNotSupported, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::OperationFailed, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} at {path}: {}", self.tag, self.message),
            None => write!(f, "{}: {}", self.tag, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_path() {
        let e = RpcError::data_missing("/m:a");
        assert_eq!(e.to_string(), "data-missing at /m:a: data node /m:a doesn't exist");
        let e = RpcError::operation_not_supported("no startup datastore");
        assert_eq!(e.to_string(), "operation-not-supported: no startup datastore");
        assert_eq!(e.error_type, ErrorType::Protocol);
    }

    #[test]
    fn tags_serialize_kebab_case() {
        let json = serde_json::to_value(RpcError::invalid_value("/m:a", "bad")).unwrap();
        assert_eq!(json["tag"], "invalid-value");
        assert_eq!(json["error_type"], "application");
        assert_eq!(ErrorTag::OperationNotSupported.as_str(), "operation-not-supported");
    }
}
