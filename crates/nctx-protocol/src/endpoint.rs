use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Where a backend lives, written `scheme:address`.
///
/// `loopback:<name>` addresses an in-process server registered under
/// `<name>`; other schemes are for connectors outside this workspace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    scheme: String,
    address: String,
}

impl Endpoint {
    pub const LOOPBACK: &'static str = "loopback";

    pub fn new(scheme: impl Into<String>, address: impl Into<String>) -> Result<Self, ProtocolError> {
        let scheme = scheme.into();
        let address = address.into();
        let invalid = |reason: &str| ProtocolError::InvalidEndpoint {
            endpoint: format!("{scheme}:{address}"),
            reason: reason.to_string(),
        };
        let scheme_char = |c: char| c.is_ascii_alphanumeric() || c == '+' || c == '-';
        if scheme.is_empty() || !scheme.chars().all(scheme_char) {
            return Err(invalid("bad scheme"));
        }
        if address.is_empty() {
            return Err(invalid("empty address"));
        }
        Ok(Self { scheme, address })
    }

    /// An in-process server endpoint.
    pub fn loopback(name: impl Into<String>) -> Self {
        Self {
            scheme: Self::LOOPBACK.to_string(),
            address: name.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_loopback(&self) -> bool {
        self.scheme == Self::LOOPBACK
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::loopback("default")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.address)
    }
}

impl FromStr for Endpoint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, address) = s.split_once(':').ok_or_else(|| ProtocolError::InvalidEndpoint {
            endpoint: s.to_string(),
            reason: "expected scheme:address".into(),
        })?;
        Self::new(scheme, address)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}
