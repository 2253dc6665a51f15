//! Schema oracle and path resolution for nctx.
//!
//! The schema itself is loaded elsewhere; this crate only consults it.
//! [`SchemaOracle`] is the read-only lookup interface, [`StaticSchema`] a
//! programmatically populated implementation, and [`PathResolver`] turns
//! path expressions into resolved, fully qualified data paths.

pub mod error;
pub mod memory;
pub mod oracle;
pub mod resolver;

pub use error::{SchemaError, SchemaResult};
pub use memory::StaticSchema;
pub use oracle::SchemaOracle;
pub use resolver::{PathResolver, ResolvedPath};
