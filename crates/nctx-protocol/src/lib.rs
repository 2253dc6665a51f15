//! RPC model for nctx.
//!
//! Defines the requests a session sends to a datastore backend, the replies
//! it gets back, and the [`Transport`] seam that carries them. Requests
//! follow the NETCONF operation set (`get-config`, `edit-config`, `commit`,
//! `discard-changes`, `validate`, `copy-config`, `close-session`); how they
//! are encoded on a wire is up to the transport.

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod rpc_error;
pub mod transport;

pub use auth::Credentials;
pub use endpoint::Endpoint;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{capabilities, DataNode, DatastoreTarget, EditRecord, RpcReply, RpcRequest};
pub use rpc_error::{ErrorTag, ErrorType, RpcError};
pub use transport::{Connector, Transport};
