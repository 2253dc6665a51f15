use std::fmt;
use std::str::FromStr;

use nctx_txn::EditOperation;
use nctx_types::MovePosition;
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::rpc_error::RpcError;

/// A configuration datastore on the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreTarget {
    #[default]
    Running,
    Startup,
    Candidate,
}

impl DatastoreTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Startup => "startup",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for DatastoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatastoreTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "startup" => Ok(Self::Startup),
            "candidate" => Ok(Self::Candidate),
            other => Err(format!("unknown datastore '{other}'")),
        }
    }
}

/// One edit as sent in `edit-config`: a canonical data path, the
/// operation, and the value in canonical lexical form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub path: String,
    pub operation: EditOperation,
    pub value: Option<String>,
    /// Target position of a `move`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<MovePosition>,
}

impl EditRecord {
    pub fn new(path: impl Into<String>, operation: EditOperation, value: Option<String>) -> Self {
        Self {
            path: path.into(),
            operation,
            value,
            insert: None,
        }
    }

    pub fn move_to(path: impl Into<String>, position: MovePosition) -> Self {
        Self {
            insert: Some(position),
            ..Self::new(path, EditOperation::Move, None)
        }
    }
}

/// One data node in a `get-config` reply. Containers and list entries
/// have no value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNode {
    pub path: String,
    pub value: Option<String>,
}

/// Requests a session sends to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rpc", rename_all = "kebab-case")]
pub enum RpcRequest {
    Hello {
        capabilities: Vec<String>,
        credentials: Credentials,
    },
    GetConfig {
        source: DatastoreTarget,
        /// Canonical path expression; `None` means the whole datastore.
        filter: Option<String>,
    },
    EditConfig {
        target: DatastoreTarget,
        edits: Vec<EditRecord>,
    },
    Commit,
    DiscardChanges,
    Validate {
        source: DatastoreTarget,
    },
    CopyConfig {
        source: DatastoreTarget,
        target: DatastoreTarget,
    },
    /// Invoke an RPC or action. `path` is the canonical path of the
    /// operation node; `input` holds leaves below its `input`.
    Execute {
        path: String,
        input: Vec<DataNode>,
    },
    CloseSession,
}

impl RpcRequest {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::GetConfig { .. } => "get-config",
            Self::EditConfig { .. } => "edit-config",
            Self::Commit => "commit",
            Self::DiscardChanges => "discard-changes",
            Self::Validate { .. } => "validate",
            Self::CopyConfig { .. } => "copy-config",
            Self::Execute { .. } => "execute",
            Self::CloseSession => "close-session",
        }
    }
}

/// Replies from the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "kebab-case")]
pub enum RpcReply {
    Hello {
        session_id: u32,
        capabilities: Vec<String>,
    },
    Ok,
    Data {
        nodes: Vec<DataNode>,
    },
    Error {
        errors: Vec<RpcError>,
    },
}

impl RpcReply {
    pub fn error(error: RpcError) -> Self {
        Self::Error {
            errors: vec![error],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Ok => "ok",
            Self::Data { .. } => "data",
            Self::Error { .. } => "rpc-error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

pub mod capabilities {
    pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
    pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";
    pub const CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
    pub const VALIDATE: &str = "urn:ietf:params:netconf:capability:validate:1.1";
    pub const STARTUP: &str = "urn:ietf:params:netconf:capability:startup:1.0";
    pub const ROLLBACK_ON_ERROR: &str = "urn:ietf:params:netconf:capability:rollback-on-error:1.0";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(RpcRequest::Commit.type_name(), "commit");
        let get = RpcRequest::GetConfig { source: DatastoreTarget::Running, filter: None };
        assert_eq!(get.type_name(), "get-config");
        assert_eq!(RpcReply::Ok.type_name(), "ok");
        assert!(RpcReply::Ok.is_ok());
        assert!(!RpcReply::error(RpcError::operation_failed("x")).is_ok());
    }

    #[test]
    fn datastore_names() {
        for target in [DatastoreTarget::Running, DatastoreTarget::Startup, DatastoreTarget::Candidate] {
            assert_eq!(target.as_str().parse::<DatastoreTarget>(), Ok(target));
        }
        assert!("operational".parse::<DatastoreTarget>().is_err());
        assert_eq!(DatastoreTarget::default(), DatastoreTarget::Running);
    }

    #[test]
    fn edit_config_json_shape() {
        let request = RpcRequest::EditConfig {
            target: DatastoreTarget::Candidate,
            edits: vec![
                EditRecord::new("/m:a", EditOperation::Set, Some("599".into())),
                EditRecord::move_to("/m:ll[.='x']", MovePosition::First),
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["rpc"], "edit-config");
        assert_eq!(json["target"], "candidate");
        assert_eq!(json["edits"][0]["operation"], "set");
        assert!(json["edits"][0].get("insert").is_none());
        assert_eq!(json["edits"][1]["insert"]["insert"], "first");
        let back: RpcRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn execute_carries_input_nodes() {
        let request = RpcRequest::Execute {
            path: "/m:launch".into(),
            input: vec![DataNode {
                path: "/m:launch/input/count".into(),
                value: Some("3".into()),
            }],
        };
        assert_eq!(request.type_name(), "execute");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["rpc"], "execute");
        assert_eq!(json["input"][0]["value"], "3");
    }

    #[test]
    fn capability_urns() {
        assert_eq!(capabilities::BASE_1_1, "urn:ietf:params:netconf:base:1.1");
        assert!(capabilities::CANDIDATE.contains("candidate"));
    }
}
