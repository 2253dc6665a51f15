//! Canonical text of typed values.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use nctx_types::TypedValue;

/// Render a value in the canonical lexical form the backend stores.
///
/// Decoding the result against the same leaf yields the value back.
pub fn render(value: &TypedValue) -> String {
    match value {
        TypedValue::Bool(b) => b.to_string(),
        TypedValue::Int8(n) => n.to_string(),
        TypedValue::Int16(n) => n.to_string(),
        TypedValue::Int32(n) => n.to_string(),
        TypedValue::Int64(n) => n.to_string(),
        TypedValue::Uint8(n) => n.to_string(),
        TypedValue::Uint16(n) => n.to_string(),
        TypedValue::Uint32(n) => n.to_string(),
        TypedValue::Uint64(n) => n.to_string(),
        TypedValue::String(s) | TypedValue::Enum(s) => s.clone(),
        TypedValue::Decimal(d) => d.to_string(),
        TypedValue::Binary(bytes) => BASE64.encode(bytes),
        TypedValue::IdentityRef { module, name } => format!("{module}:{name}"),
        TypedValue::Bits(bits) => bits.iter().cloned().collect::<Vec<_>>().join(" "),
        TypedValue::Empty | TypedValue::Absent => String::new(),
    }
}
