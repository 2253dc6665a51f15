//! Canonical typed leaf values.
//!
//! A [`TypedValue`] is what the coercion layer produces from a caller's
//! native value and what every read hands back. Values are plain data:
//! cloned freely, never shared by reference between edits.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

// ---------------------------------------------------------------------------
// Decimal64
// ---------------------------------------------------------------------------

/// Fixed-point decimal: a scaled 64-bit integer plus its fraction digits.
///
/// `Decimal64 { value: 123544, fraction_digits: 3 }` is `123.544`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decimal64 {
    value: i64,
    fraction_digits: u8,
}

impl Decimal64 {
    pub const MAX_FRACTION_DIGITS: u8 = 18;

    /// Create a decimal from an already scaled integer.
    pub fn new(value: i64, fraction_digits: u8) -> Result<Self, ValueError> {
        if fraction_digits == 0 || fraction_digits > Self::MAX_FRACTION_DIGITS {
            return Err(ValueError::InvalidFractionDigits(fraction_digits));
        }
        Ok(Self {
            value,
            fraction_digits,
        })
    }

    /// The scaled integer representation.
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    /// Parse a decimal literal (`-12.5`, `+3`, `0.125`) at the given scale.
    ///
    /// Trailing zeros beyond the scale are accepted; significant digits
    /// beyond it are not.
    pub fn parse(literal: &str, fraction_digits: u8) -> Result<Self, ValueError> {
        if fraction_digits == 0 || fraction_digits > Self::MAX_FRACTION_DIGITS {
            return Err(ValueError::InvalidFractionDigits(fraction_digits));
        }
        let invalid = || ValueError::InvalidDecimal(literal.to_string());

        let (negative, unsigned) = match literal.as_bytes().first() {
            Some(b'-') => (true, &literal[1..]),
            Some(b'+') => (false, &literal[1..]),
            Some(_) => (false, literal),
            None => return Err(invalid()),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if unsigned.contains('.') && frac_part.is_empty() {
            return Err(invalid());
        }

        let significant = frac_part.trim_end_matches('0');
        if significant.len() > fraction_digits as usize {
            return Err(ValueError::TooManyFractionDigits {
                literal: literal.to_string(),
                fraction_digits,
            });
        }

        let overflow = || ValueError::DecimalOverflow(literal.to_string());
        let scale = 10i128.pow(fraction_digits as u32);
        let whole: i128 = int_part.parse().map_err(|_| overflow())?;
        let mut frac: i128 = 0;
        if !significant.is_empty() {
            frac = significant.parse().map_err(|_| invalid())?;
            frac *= 10i128.pow((fraction_digits as usize - significant.len()) as u32);
        }
        let magnitude = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(overflow)?;
        let scaled = if negative { -magnitude } else { magnitude };
        let value = i64::try_from(scaled).map_err(|_| overflow())?;

        Ok(Self {
            value,
            fraction_digits,
        })
    }

    /// Re-express this decimal at another scale without losing precision.
    pub fn rescale(&self, fraction_digits: u8) -> Result<Self, ValueError> {
        if fraction_digits == 0 || fraction_digits > Self::MAX_FRACTION_DIGITS {
            return Err(ValueError::InvalidFractionDigits(fraction_digits));
        }
        let value = if fraction_digits >= self.fraction_digits {
            let factor = 10i64.pow((fraction_digits - self.fraction_digits) as u32);
            self.value
                .checked_mul(factor)
                .ok_or_else(|| ValueError::DecimalOverflow(self.to_string()))?
        } else {
            let factor = 10i64.pow((self.fraction_digits - fraction_digits) as u32);
            if self.value % factor != 0 {
                return Err(ValueError::TooManyFractionDigits {
                    literal: self.to_string(),
                    fraction_digits,
                });
            }
            self.value / factor
        };
        Ok(Self {
            value,
            fraction_digits,
        })
    }

    pub fn to_f64(&self) -> f64 {
        self.value as f64 / 10f64.powi(self.fraction_digits as i32)
    }
}

/// Canonical form: no leading `+`, at least one digit on each side of the
/// point, no trailing zeros after the first fractional digit.
impl fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value < 0 { "-" } else { "" };
        let magnitude = self.value.unsigned_abs();
        let scale = 10u64.pow(self.fraction_digits as u32);
        let whole = magnitude / scale;
        let frac = format!(
            "{:0width$}",
            magnitude % scale,
            width = self.fraction_digits as usize
        );
        let frac = frac.trim_end_matches('0');
        let frac = if frac.is_empty() { "0" } else { frac };
        write!(f, "{sign}{whole}.{frac}")
    }
}

// ---------------------------------------------------------------------------
// TypedValue
// ---------------------------------------------------------------------------

/// A canonical leaf value whose variant matches the schema's declared type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum TypedValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    String(String),
    /// Enumeration symbol.
    Enum(String),
    Decimal(Decimal64),
    /// Opaque bytes of a `binary` leaf.
    Binary(Vec<u8>),
    IdentityRef { module: String, name: String },
    Bits(BTreeSet<String>),
    /// The value of an `empty` leaf that is present.
    Empty,
    /// No value: the payload of a delete.
    Absent,
}

impl TypedValue {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Uint8(_) => "uint8",
            Self::Uint16(_) => "uint16",
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::String(_) => "string",
            Self::Enum(_) => "enumeration",
            Self::Decimal(_) => "decimal64",
            Self::Binary(_) => "binary",
            Self::IdentityRef { .. } => "identityref",
            Self::Bits(_) => "bits",
            Self::Empty => "empty",
            Self::Absent => "absent",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The integer payload, widened, for any integer variant.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::Int8(v) => Some(v as i128),
            Self::Int16(v) => Some(v as i128),
            Self::Int32(v) => Some(v as i128),
            Self::Int64(v) => Some(v as i128),
            Self::Uint8(v) => Some(v as i128),
            Self::Uint16(v) => Some(v as i128),
            Self::Uint32(v) => Some(v as i128),
            Self::Uint64(v) => Some(v as i128),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The textual payload of string and enumeration values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }
}
