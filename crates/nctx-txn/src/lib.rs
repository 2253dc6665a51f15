//! Transaction buffer for nctx.
//!
//! Edits are staged here between a session's write calls and its next
//! commit. The buffer is a purely keyed accumulation structure: it performs
//! no schema validation, keeps distinct paths in insertion order, and lets
//! a later edit to the same path replace the earlier one.

pub mod buffer;
pub mod edit;
pub mod error;
pub mod staging;
pub mod status;

pub use buffer::TransactionBuffer;
pub use edit::{EditOperation, PendingEdit, StagedValue};
pub use error::{TxnError, TxnResult};
pub use staging::{prepare, ValidationMode};
pub use status::BufferSummary;
