//! Caller-facing heterogeneous values.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use nctx_types::{Decimal64, TypedValue};
use serde_json::Value;

/// A value as the caller supplied it, before any schema is consulted.
///
/// `From` conversions exist for the native types callers typically have at
/// hand, so `session.set_leaf(path, 599)` and `session.set_leaf(path, "61")`
/// both work.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    Text(String),
    /// An enumeration symbol given explicitly as such.
    Enum(String),
    Decimal(Decimal64),
    Binary(Vec<u8>),
    Identity {
        module: Option<String>,
        name: String,
    },
    Bits(BTreeSet<String>),
    Empty,
    /// Arrays, objects, and `null` from JSON: never a valid leaf value.
    Structured(Value),
}

impl RawValue {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::Enum(_) => "enum",
            Self::Decimal(_) => "decimal",
            Self::Binary(_) => "binary",
            Self::Identity { .. } => "identity",
            Self::Bits(_) => "bits",
            Self::Empty => "empty",
            Self::Structured(_) => "structured",
        }
    }

    /// Textual form of the value, as it would be sent to a backend that
    /// does its own parsing.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) | Self::Enum(s) => s.clone(),
            Self::Decimal(d) => d.to_string(),
            Self::Binary(bytes) => BASE64.encode(bytes),
            Self::Identity {
                module: Some(module),
                name,
            } => format!("{module}:{name}"),
            Self::Identity { module: None, name } => name.clone(),
            Self::Bits(bits) => bits.iter().cloned().collect::<Vec<_>>().join(" "),
            Self::Empty => String::new(),
            Self::Structured(value) => value.to_string(),
        }
    }
}

macro_rules! raw_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RawValue {
                fn from(n: $t) -> Self {
                    Self::Int(n as i128)
                }
            }
        )*
    };
}

raw_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for RawValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for RawValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for RawValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Decimal64> for RawValue {
    fn from(d: Decimal64) -> Self {
        Self::Decimal(d)
    }
}

/// JSON scalars map onto the matching native kind; everything else is
/// structured.
impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Self::Int(u as i128)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => Self::Structured(other),
        }
    }
}

impl From<TypedValue> for RawValue {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Bool(b) => Self::Bool(b),
            TypedValue::String(s) => Self::Text(s),
            TypedValue::Enum(s) => Self::Enum(s),
            TypedValue::Decimal(d) => Self::Decimal(d),
            TypedValue::Binary(bytes) => Self::Binary(bytes),
            TypedValue::IdentityRef { module, name } => Self::Identity {
                module: Some(module),
                name,
            },
            TypedValue::Bits(bits) => Self::Bits(bits),
            TypedValue::Empty => Self::Empty,
            TypedValue::Absent => Self::Structured(Value::Null),
            integer => match integer.as_integer() {
                Some(n) => Self::Int(n),
                None => Self::Structured(Value::Null),
            },
        }
    }
}
