//! High-level client for nctx.
//!
//! A [`DatastoreSession`] is the main entry point for applications: it
//! resolves human-written paths against the schema, coerces native values
//! into the declared YANG types, stages edits locally, and commits them to
//! the backend as one all-or-nothing transaction. Committed changes can be
//! watched through typed [`Subscription`]s.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let config = SessionConfig::new(Endpoint::loopback("lab"));
//! let session = DatastoreSession::connect(config, &connector, schema).await?;
//!
//! session
//!     .set_leaf("/ietf-netconf-server:netconf-server/session-options/hello-timeout", 61)
//!     .await?;
//! session.commit().await?;
//!
//! let values = session.read("/ietf-netconf-server:*").await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod receipt;
pub mod session;

pub use config::SessionConfig;
pub use error::{CommitError, SessionError, SessionResult};
pub use logging::LogConfig;
pub use receipt::CommitReceipt;
pub use session::{DatastoreSession, SessionState};

// Re-export the types callers handle directly
pub use nctx_coerce::{RawValue, TypeError};
pub use nctx_notify::{ChangeEvent, ChangeFeed, ChangeOperation, Subscription};
pub use nctx_protocol::{Credentials, DatastoreTarget, Endpoint, ErrorTag, RpcError};
pub use nctx_schema::{SchemaOracle, StaticSchema};
pub use nctx_txn::{EditOperation, PendingEdit, StagedValue, ValidationMode};
pub use nctx_types::{DataPath, MovePosition, PathError, TypedValue};
