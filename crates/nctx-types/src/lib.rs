//! Foundation types for nctx.
//!
//! This crate provides the value, schema, and addressing types shared by
//! every other nctx crate. It has no knowledge of sessions or transports.
//!
//! # Key Types
//!
//! - [`TypedValue`]: Canonical, schema-typed leaf value
//! - [`Decimal64`]: Fixed-point decimal with declared fraction digits
//! - [`SchemaNode`]: Immutable metadata for one node of the loaded schema
//! - [`TypeInfo`]: Declared leaf type plus range/length/pattern constraints
//! - [`DataPath`]: Parsed path expression (`/module:container/list[key='v']/leaf`)
//! - [`MovePosition`]: Target position when reordering a user-ordered list
//! - [`PathError`]: Path parsing and resolution failures

pub mod error;
pub mod path;
pub mod position;
pub mod schema;
pub mod value;

pub use error::{PathError, ValueError};
pub use path::{is_quotable, DataPath, PathStep, Predicate};
pub use position::MovePosition;
pub use schema::{
    Constraints, Identity, LeafInfo, LeafType, LengthInterval, NodeKind, RangeInterval,
    SchemaNode, TypeInfo,
};
pub use value::{Decimal64, TypedValue};
