//! Type coercion for nctx.
//!
//! Callers hand the session values of whatever native kind is convenient:
//! integers, booleans, floats, text, JSON. The [`CoercionEngine`] is the one
//! place that turns such a [`RawValue`] into the canonical [`TypedValue`]
//! the schema declares for a leaf, and turns stored literals back into
//! typed values on reads.
//!
//! Encoding policy:
//!
//! - A value whose kind already matches the declared type family is checked
//!   against range, length, and pattern restrictions
//!   ([`TypeError::ConstraintViolation`]).
//! - Text destined for a non-string type is parsed canonically: decimal
//!   integer literals, case-sensitive `true`/`false`, exact enum symbols
//!   ([`TypeError::UnparsableLiteral`]).
//! - Anything without a coercion path, such as a JSON object for a scalar
//!   leaf, is [`TypeError::IncompatibleKind`].
//!
//! [`TypedValue`]: nctx_types::TypedValue

pub mod engine;
pub mod error;
pub mod raw;
pub mod render;

pub use engine::CoercionEngine;
pub use error::{CoerceResult, TypeError};
pub use raw::RawValue;
pub use render::render;
