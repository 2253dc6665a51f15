//! RPCs and actions served by the loopback backend.
//!
//! A handler is registered per operation schema path and sees its input
//! already checked against the schema: parameter paths relative to the
//! operation's `input` container, mapped to canonical literals. It answers
//! in the same shape, relative to `output`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use nctx_protocol::RpcError;
use nctx_types::DataPath;

/// One invocation of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationCall {
    pub session: u32,
    /// Concrete path of the operation; for an action it carries the keys
    /// of the entry it runs on.
    pub path: DataPath,
    pub input: BTreeMap<String, String>,
}

impl OperationCall {
    /// Literal of the input parameter at `relative`, e.g. `"delay"`.
    pub fn param(&self, relative: &str) -> Option<&str> {
        self.input.get(relative).map(String::as_str)
    }
}

#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn invoke(&self, call: &OperationCall) -> Result<BTreeMap<String, String>, RpcError>;
}

#[async_trait]
impl<F> OperationHandler for F
where
    F: Fn(&OperationCall) -> Result<BTreeMap<String, String>, RpcError> + Send + Sync,
{
    async fn invoke(&self, call: &OperationCall) -> Result<BTreeMap<String, String>, RpcError> {
        self(call)
    }
}
