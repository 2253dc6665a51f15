use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use nctx_protocol::{
    Connector, Endpoint, ErrorTag, ErrorType, ProtocolError, ProtocolResult, RpcError, RpcReply,
    RpcRequest, Transport,
};
use tracing::debug;

use crate::server::LoopbackServer;

/// Hands out connections to [`LoopbackServer`]s registered by name.
///
/// Only `loopback:<name>` endpoints are understood.
#[derive(Default)]
pub struct LoopbackConnector {
    servers: RwLock<HashMap<String, Arc<LoopbackServer>>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `server` reachable at `loopback:<server name>`.
    pub fn register(&self, server: Arc<LoopbackServer>) -> Endpoint {
        let endpoint = Endpoint::loopback(server.name());
        self.servers
            .write()
            .expect("server registry lock poisoned")
            .insert(server.name().to_string(), server);
        endpoint
    }

    pub fn server(&self, name: &str) -> Option<Arc<LoopbackServer>> {
        self.servers
            .read()
            .expect("server registry lock poisoned")
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, endpoint: &Endpoint) -> ProtocolResult<Box<dyn Transport>> {
        if !endpoint.is_loopback() {
            return Err(ProtocolError::UnsupportedEndpoint(endpoint.to_string()));
        }
        let server = self
            .server(endpoint.address())
            .ok_or_else(|| ProtocolError::ConnectionRefused(endpoint.to_string()))?;
        if server.is_shut_down() {
            return Err(ProtocolError::ConnectionRefused(endpoint.to_string()));
        }
        debug!(%endpoint, "loopback connection opened");
        Ok(Box::new(LoopbackTransport::new(server, endpoint.clone())))
    }
}

/// One client connection to a [`LoopbackServer`].
///
/// The first request must be a hello; its reply binds the connection to a
/// server session, which ends when the connection is closed or dropped.
pub struct LoopbackTransport {
    server: Arc<LoopbackServer>,
    endpoint: Endpoint,
    session: AtomicU32,
    closed: AtomicBool,
}

impl LoopbackTransport {
    pub fn new(server: Arc<LoopbackServer>, endpoint: Endpoint) -> Self {
        Self {
            server,
            endpoint,
            session: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// The server session id, or 0 before the hello exchange.
    pub fn session_id(&self) -> u32 {
        self.session.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, request: RpcRequest) -> ProtocolResult<RpcReply> {
        if self.closed.load(Ordering::SeqCst) || self.server.is_shut_down() {
            return Err(ProtocolError::ConnectionClosed);
        }

        let delay = self.server.response_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        // The server may have gone away while the request was in flight.
        if self.server.is_shut_down() {
            return Err(ProtocolError::ConnectionClosed);
        }

        if let RpcRequest::Hello { credentials, .. } = &request {
            if self.session_id() != 0 {
                return Ok(RpcReply::error(RpcError::new(
                    ErrorType::Protocol,
                    ErrorTag::OperationFailed,
                    "hello already exchanged",
                )));
            }
            return Ok(match self.server.open_session(credentials).await {
                Ok(id) => {
                    self.session.store(id, Ordering::SeqCst);
                    RpcReply::Hello {
                        session_id: id,
                        capabilities: self.server.config().capabilities.clone(),
                    }
                }
                Err(e) => RpcReply::error(e),
            });
        }

        let session = self.session_id();
        if session == 0 {
            return Ok(RpcReply::error(RpcError::new(
                ErrorType::Protocol,
                ErrorTag::OperationFailed,
                "no hello received",
            )));
        }

        let closing = matches!(request, RpcRequest::CloseSession);
        let reply = self.server.handle(session, request).await;
        if closing {
            self.closed.store(true, Ordering::SeqCst);
        }
        Ok(reply)
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        let session = self.session_id();
        if session != 0 && !self.closed.load(Ordering::SeqCst) {
            self.server.end_session(session);
        }
    }
}
