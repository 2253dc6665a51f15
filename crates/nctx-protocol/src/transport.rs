use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::ProtocolResult;
use crate::message::{RpcReply, RpcRequest};

/// One established connection to a datastore backend.
///
/// A transport delivers a request and returns the backend's reply. RPC
/// level failures come back as [`RpcReply::Error`]; only failures of the
/// connection itself are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RpcRequest) -> ProtocolResult<RpcReply>;

    fn endpoint(&self) -> &Endpoint;
}

/// Opens transports for the endpoint schemes it understands.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> ProtocolResult<Box<dyn Transport>>;
}
