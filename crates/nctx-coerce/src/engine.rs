//! The coercion engine: [`RawValue`] to [`TypedValue`] and back.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use nctx_types::{Decimal64, LeafType, SchemaNode, TypeInfo, TypedValue, ValueError};
use regex::Regex;

use crate::error::{CoerceResult, TypeError};
use crate::raw::RawValue;
use crate::render::render;

/// Converts caller values to canonical typed values per a node's schema.
///
/// The engine is stateless apart from a cache of compiled patterns; clones
/// share the cache.
#[derive(Clone, Debug, Default)]
pub struct CoercionEngine {
    patterns: Arc<RwLock<HashMap<String, Regex>>>,
}

impl CoercionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a caller value for `node`.
    ///
    /// Only leaves and leaf-lists carry values; any other node kind is an
    /// [`TypeError::IncompatibleKind`].
    pub fn encode(&self, node: &SchemaNode, raw: RawValue) -> CoerceResult<TypedValue> {
        let info = node.type_info().ok_or_else(|| {
            TypeError::incompatible(&node.path, node.kind.name(), raw.kind_name())
        })?;
        self.encode_as(&node.path, info, &raw)
    }

    /// Decode a stored literal into the typed value the schema declares.
    pub fn decode(&self, node: &SchemaNode, literal: &str) -> CoerceResult<TypedValue> {
        self.encode(node, RawValue::Text(literal.to_string()))
    }

    /// Re-check an already typed value against the node's restrictions.
    pub fn check(&self, node: &SchemaNode, value: &TypedValue) -> CoerceResult<()> {
        self.encode(node, RawValue::from(value.clone())).map(|_| ())
    }

    /// Canonical text of a value; see [`render`].
    pub fn render(&self, value: &TypedValue) -> String {
        render(value)
    }

    fn encode_as(&self, path: &str, info: &TypeInfo, raw: &RawValue) -> CoerceResult<TypedValue> {
        let ctx = Ctx {
            path,
            expected: info.leaf_type.name(),
            info,
        };
        match &info.leaf_type {
            LeafType::Int8 => self.integer(&ctx, raw).map(|n| TypedValue::Int8(n as i8)),
            LeafType::Int16 => self.integer(&ctx, raw).map(|n| TypedValue::Int16(n as i16)),
            LeafType::Int32 => self.integer(&ctx, raw).map(|n| TypedValue::Int32(n as i32)),
            LeafType::Int64 => self.integer(&ctx, raw).map(|n| TypedValue::Int64(n as i64)),
            LeafType::Uint8 => self.integer(&ctx, raw).map(|n| TypedValue::Uint8(n as u8)),
            LeafType::Uint16 => self.integer(&ctx, raw).map(|n| TypedValue::Uint16(n as u16)),
            LeafType::Uint32 => self.integer(&ctx, raw).map(|n| TypedValue::Uint32(n as u32)),
            LeafType::Uint64 => self.integer(&ctx, raw).map(|n| TypedValue::Uint64(n as u64)),
            LeafType::Decimal { fraction_digits } => self.decimal(&ctx, *fraction_digits, raw),
            LeafType::Bool => match raw {
                RawValue::Bool(b) => Ok(TypedValue::Bool(*b)),
                RawValue::Text(s) => match s.as_str() {
                    "true" => Ok(TypedValue::Bool(true)),
                    "false" => Ok(TypedValue::Bool(false)),
                    _ => Err(ctx.unparsable(s, "expected 'true' or 'false'")),
                },
                other => Err(ctx.incompatible(other)),
            },
            LeafType::String => match raw {
                RawValue::Text(s) => {
                    ctx.check_length(s, s.chars().count() as u64)?;
                    self.check_patterns(&ctx, s)?;
                    Ok(TypedValue::String(s.clone()))
                }
                other => Err(ctx.incompatible(other)),
            },
            LeafType::Enumeration(symbols) => match raw {
                RawValue::Enum(s) | RawValue::Text(s) if symbols.contains(s) => {
                    Ok(TypedValue::Enum(s.clone()))
                }
                RawValue::Enum(s) => Err(ctx.violation(s, format!("not one of {}", list(symbols)))),
                RawValue::Text(s) => Err(ctx.unparsable(s, format!("not one of {}", list(symbols)))),
                other => Err(ctx.incompatible(other)),
            },
            LeafType::Binary => {
                let bytes = match raw {
                    RawValue::Binary(bytes) => bytes.clone(),
                    RawValue::Text(s) => BASE64
                        .decode(s)
                        .map_err(|e| ctx.unparsable(s, format!("invalid base64: {e}")))?,
                    other => return Err(ctx.incompatible(other)),
                };
                ctx.check_length(&BASE64.encode(&bytes), bytes.len() as u64)?;
                Ok(TypedValue::Binary(bytes))
            }
            LeafType::Empty => match raw {
                RawValue::Empty => Ok(TypedValue::Empty),
                RawValue::Text(s) if s.is_empty() => Ok(TypedValue::Empty),
                RawValue::Text(s) => Err(ctx.unparsable(s, "an empty leaf carries no value")),
                other => Err(ctx.incompatible(other)),
            },
            LeafType::IdentityRef(identities) => {
                let (module, name, textual) = match raw {
                    RawValue::Identity { module, name } => (module.as_deref(), name.as_str(), false),
                    RawValue::Text(s) => match s.split_once(':') {
                        Some((m, n)) => (Some(m), n, true),
                        None => (None, s.as_str(), true),
                    },
                    other => return Err(ctx.incompatible(other)),
                };
                let found = identities
                    .iter()
                    .find(|id| id.name == name && module.map_or(true, |m| m == id.module));
                match found {
                    Some(id) => Ok(TypedValue::IdentityRef {
                        module: id.module.clone(),
                        name: id.name.clone(),
                    }),
                    None if textual => Err(ctx.unparsable(&raw.to_literal(), "unknown identity")),
                    None => Err(ctx.violation(&raw.to_literal(), "unknown identity")),
                }
            }
            LeafType::Bits(allowed) => {
                let (bits, textual) = match raw {
                    RawValue::Bits(bits) => (bits.clone(), false),
                    RawValue::Text(s) => (s.split_whitespace().map(String::from).collect(), true),
                    other => return Err(ctx.incompatible(other)),
                };
                if let Some(unknown) = bits.iter().find(|b| !allowed.contains(*b)) {
                    let reason = format!("unknown bit '{unknown}'");
                    return Err(if textual {
                        ctx.unparsable(&raw.to_literal(), reason)
                    } else {
                        ctx.violation(&raw.to_literal(), reason)
                    });
                }
                Ok(TypedValue::Bits(bits))
            }
            LeafType::LeafRef { target_type, .. } => self.encode_as(path, target_type, raw),
            LeafType::Union(members) => {
                let mut first_failure = None;
                for member in members {
                    match self.encode_as(path, member, raw) {
                        Ok(value) => return Ok(value),
                        Err(e) if !e.is_incompatible_kind() && first_failure.is_none() => {
                            first_failure = Some(e)
                        }
                        Err(_) => {}
                    }
                }
                Err(match (raw, first_failure) {
                    (RawValue::Text(s), Some(_)) => {
                        ctx.unparsable(s, "matches none of the member types")
                    }
                    (_, Some(e)) => e,
                    (other, None) => ctx.incompatible(other),
                })
            }
        }
    }

    fn integer(&self, ctx: &Ctx<'_>, raw: &RawValue) -> CoerceResult<i128> {
        let n = match raw {
            RawValue::Int(n) => *n,
            RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 => *f as i128,
            RawValue::Text(s) => parse_integer(s).ok_or_else(|| {
                ctx.unparsable(s, "expected a decimal integer literal")
            })?,
            other => return Err(ctx.incompatible(other)),
        };
        let (min, max) = ctx
            .info
            .leaf_type
            .integer_bounds()
            .unwrap_or((i128::MIN, i128::MAX));
        if n < min || n > max {
            return Err(ctx.violation(
                &n.to_string(),
                format!("{} holds {min}..{max}", ctx.expected),
            ));
        }
        ctx.check_range(n, &n.to_string(), |b| b.to_string())?;
        Ok(n)
    }

    fn decimal(&self, ctx: &Ctx<'_>, fraction_digits: u8, raw: &RawValue) -> CoerceResult<TypedValue> {
        let shown = raw.to_literal();
        let as_violation = |e: ValueError| ctx.violation(&shown, e.to_string());
        let d = match raw {
            RawValue::Decimal(d) => d.rescale(fraction_digits).map_err(as_violation)?,
            RawValue::Int(n) => {
                let scaled = n
                    .checked_mul(10i128.pow(fraction_digits.min(18) as u32))
                    .and_then(|s| i64::try_from(s).ok())
                    .ok_or_else(|| ctx.violation(&shown, "does not fit in decimal64"))?;
                Decimal64::new(scaled, fraction_digits).map_err(as_violation)?
            }
            RawValue::Float(f) if f.is_finite() => {
                Decimal64::parse(&f.to_string(), fraction_digits).map_err(as_violation)?
            }
            RawValue::Text(s) => Decimal64::parse(s, fraction_digits).map_err(|e| match e {
                ValueError::InvalidDecimal(_) => ctx.unparsable(s, "expected a decimal literal"),
                other => as_violation(other),
            })?,
            other => return Err(ctx.incompatible(other)),
        };
        ctx.check_range(d.value() as i128, &d.to_string(), |b| {
            Decimal64::new(b as i64, fraction_digits)
                .map(|d| d.to_string())
                .unwrap_or_else(|_| b.to_string())
        })?;
        Ok(TypedValue::Decimal(d))
    }

    fn check_patterns(&self, ctx: &Ctx<'_>, value: &str) -> CoerceResult<()> {
        for pattern in &ctx.info.constraints.patterns {
            let re = self
                .compiled(pattern)
                .map_err(|e| ctx.violation(value, format!("pattern '{pattern}' is invalid: {e}")))?;
            if !re.is_match(value) {
                return Err(ctx.violation(value, format!("does not match pattern '{pattern}'")));
            }
        }
        Ok(())
    }

    /// Patterns are anchored at both ends, as in XSD.
    fn compiled(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Ok(cache) = self.patterns.read() {
            if let Some(re) = cache.get(pattern) {
                return Ok(re.clone());
            }
        }
        let re = Regex::new(&format!("^(?:{pattern})$"))?;
        if let Ok(mut cache) = self.patterns.write() {
            cache.insert(pattern.to_string(), re.clone());
        }
        Ok(re)
    }
}

/// Per-call context for error construction.
struct Ctx<'a> {
    path: &'a str,
    expected: &'static str,
    info: &'a TypeInfo,
}

impl Ctx<'_> {
    fn incompatible(&self, raw: &RawValue) -> TypeError {
        TypeError::incompatible(self.path, self.expected, raw.kind_name())
    }

    fn unparsable(&self, literal: &str, reason: impl Into<String>) -> TypeError {
        TypeError::unparsable(self.path, self.expected, literal, reason)
    }

    fn violation(&self, value: &str, reason: impl Into<String>) -> TypeError {
        TypeError::violation(self.path, self.expected, value, reason)
    }

    fn check_range(
        &self,
        value: i128,
        shown: &str,
        bound: impl Fn(i128) -> String,
    ) -> CoerceResult<()> {
        let range = &self.info.constraints.range;
        if range.is_empty() || range.iter().any(|r| r.contains(value)) {
            return Ok(());
        }
        let allowed = range
            .iter()
            .map(|r| format!("{}..{}", bound(r.min), bound(r.max)))
            .collect::<Vec<_>>()
            .join(" | ");
        Err(self.violation(shown, format!("allowed range is {allowed}")))
    }

    fn check_length(&self, shown: &str, length: u64) -> CoerceResult<()> {
        let intervals = &self.info.constraints.length;
        if intervals.is_empty() || intervals.iter().any(|l| l.contains(length)) {
            return Ok(());
        }
        let allowed = intervals
            .iter()
            .map(|l| format!("{}..{}", l.min, l.max))
            .collect::<Vec<_>>()
            .join(" | ");
        Err(self.violation(shown, format!("length {length} is outside {allowed}")))
    }
}

/// Decimal integer literal with an optional sign.
fn parse_integer(s: &str) -> Option<i128> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.strip_prefix('+').unwrap_or(s).parse().ok()
}

fn list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use nctx_types::{Identity, NodeKind};
    use serde_json::json;

    fn leaf(leaf_type: LeafType) -> SchemaNode {
        leaf_with(TypeInfo::new(leaf_type))
    }

    fn leaf_with(info: TypeInfo) -> SchemaNode {
        SchemaNode {
            path: "/m:leaf".into(),
            module: "m".into(),
            name: "leaf".into(),
            kind: NodeKind::Leaf(info.into()),
            config: true,
            description: None,
            user_ordered: false,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn integer_from_native_and_text() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Uint16);
        assert_eq!(e.encode(&node, 599.into()).unwrap(), TypedValue::Uint16(599));
        assert_eq!(e.encode(&node, "61".into()).unwrap(), TypedValue::Uint16(61));
        assert_eq!(e.encode(&node, "+61".into()).unwrap(), TypedValue::Uint16(61));
        assert_eq!(e.encode(&node, 59.0f64.into()).unwrap(), TypedValue::Uint16(59));
    }

    #[test]
    fn integer_errors() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Uint16);
        assert!(matches!(
            e.encode(&node, "blesmrt".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, " 61".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, 70000.into()),
            Err(TypeError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            e.encode(&node, (-1).into()),
            Err(TypeError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            e.encode(&node, true.into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
        assert!(matches!(
            e.encode(&node, 1.5f64.into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
        assert!(matches!(
            e.encode(&node, json!({"x": 1}).into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
    }

    #[test]
    fn integer_range_restriction() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::new(LeafType::Int32).with_range(10, 20).with_range(30, 40));
        assert!(e.encode(&node, 15.into()).is_ok());
        assert!(e.encode(&node, 35.into()).is_ok());
        let err = e.encode(&node, 25.into()).unwrap_err();
        assert_eq!(
            err,
            TypeError::ConstraintViolation {
                path: "/m:leaf".into(),
                expected: "int32".into(),
                value: "25".into(),
                reason: "allowed range is 10..20 | 30..40".into(),
            }
        );
    }

    #[test]
    fn every_integer_width() {
        let e = CoercionEngine::new();
        let cases = [
            (LeafType::Int8, TypedValue::Int8(-5)),
            (LeafType::Int16, TypedValue::Int16(-5)),
            (LeafType::Int32, TypedValue::Int32(-5)),
            (LeafType::Int64, TypedValue::Int64(-5)),
        ];
        for (ty, expected) in cases {
            assert_eq!(e.encode(&leaf(ty), "-5".into()).unwrap(), expected);
        }
        assert_eq!(e.encode(&leaf(LeafType::Uint8), 255.into()).unwrap(), TypedValue::Uint8(255));
        assert_eq!(
            e.encode(&leaf(LeafType::Uint32), "4294967295".into()).unwrap(),
            TypedValue::Uint32(u32::MAX)
        );
        assert_eq!(
            e.encode(&leaf(LeafType::Uint64), u64::MAX.into()).unwrap(),
            TypedValue::Uint64(u64::MAX)
        );
        assert!(e.encode(&leaf(LeafType::Int8), 128.into()).is_err());
    }

    #[test]
    fn booleans_are_case_sensitive() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Bool);
        assert_eq!(e.encode(&node, true.into()).unwrap(), TypedValue::Bool(true));
        assert_eq!(e.encode(&node, "false".into()).unwrap(), TypedValue::Bool(false));
        assert!(matches!(
            e.encode(&node, "True".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, 1.into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
    }

    #[test]
    fn enumerations_match_exactly() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::enumeration(["lol", "coze"]));
        assert_eq!(e.encode(&node, "lol".into()).unwrap(), TypedValue::Enum("lol".into()));
        assert_eq!(
            e.encode(&node, RawValue::Enum("coze".into())).unwrap(),
            TypedValue::Enum("coze".into())
        );
        assert!(matches!(
            e.encode(&node, "LOL".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, RawValue::Enum("nope".into())),
            Err(TypeError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn strings_check_length_and_pattern() {
        let e = CoercionEngine::new();
        let node = leaf_with(
            TypeInfo::new(LeafType::String)
                .with_length(2, 5)
                .with_pattern("[a-z]+"),
        );
        assert_eq!(e.encode(&node, "abc".into()).unwrap(), TypedValue::String("abc".into()));
        assert!(matches!(
            e.encode(&node, "a".into()),
            Err(TypeError::ConstraintViolation { .. })
        ));
        // Anchored: a partial match is not enough.
        assert!(matches!(
            e.encode(&node, "ab1".into()),
            Err(TypeError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            e.encode(&node, 5.into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::new(LeafType::String).with_pattern("(unclosed"));
        let err = e.encode(&node, "x".into()).unwrap_err();
        assert!(err.to_string().contains("is invalid"), "{err}");
    }

    #[test]
    fn decimals() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Decimal { fraction_digits: 3 });
        let expected = TypedValue::Decimal(Decimal64::new(123544, 3).unwrap());
        assert_eq!(e.encode(&node, "123.544".into()).unwrap(), expected);
        assert_eq!(e.encode(&node, 123.544f64.into()).unwrap(), expected);
        assert_eq!(
            e.encode(&node, 2.into()).unwrap(),
            TypedValue::Decimal(Decimal64::new(2000, 3).unwrap())
        );
        assert!(matches!(
            e.encode(&node, "12,5".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, "1.2345".into()),
            Err(TypeError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn decimal_range_uses_scaled_bounds() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::new(LeafType::Decimal { fraction_digits: 2 }).with_range(50, 250));
        assert!(e.encode(&node, "2.5".into()).is_ok());
        let err = e.encode(&node, "2.51".into()).unwrap_err();
        assert!(err.to_string().contains("0.5..2.5"), "{err}");
    }

    #[test]
    fn binary_is_base64() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Binary);
        assert_eq!(e.encode(&node, "aGk=".into()).unwrap(), TypedValue::Binary(b"hi".to_vec()));
        assert_eq!(
            e.encode(&node, vec![1u8, 2, 3].into()).unwrap(),
            TypedValue::Binary(vec![1, 2, 3])
        );
        assert!(matches!(
            e.encode(&node, "not base64!".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
    }

    #[test]
    fn empty_leaves() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Empty);
        assert_eq!(e.encode(&node, RawValue::Empty).unwrap(), TypedValue::Empty);
        assert_eq!(e.decode(&node, "").unwrap(), TypedValue::Empty);
        assert!(e.encode(&node, "x".into()).is_err());
    }

    #[test]
    fn identityrefs() {
        let e = CoercionEngine::new();
        let ids = [Identity::new("example-schema", "apple"), Identity::new("other", "pear")];
        let node = leaf(LeafType::IdentityRef(ids.into_iter().collect()));
        let apple = TypedValue::IdentityRef {
            module: "example-schema".into(),
            name: "apple".into(),
        };
        assert_eq!(e.encode(&node, "apple".into()).unwrap(), apple);
        assert_eq!(e.encode(&node, "example-schema:apple".into()).unwrap(), apple);
        assert!(matches!(
            e.encode(&node, "other:apple".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, RawValue::Identity { module: None, name: "plum".into() }),
            Err(TypeError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn bits() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Bits(set(&["a", "b", "c"])));
        assert_eq!(e.encode(&node, "c a".into()).unwrap(), TypedValue::Bits(set(&["a", "c"])));
        assert!(matches!(
            e.encode(&node, "a z".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, RawValue::Bits(set(&["z"]))),
            Err(TypeError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn leafref_uses_target_type() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::leafref("/m:person/m:age", TypeInfo::new(LeafType::Uint8)));
        assert_eq!(e.encode(&node, "42".into()).unwrap(), TypedValue::Uint8(42));
        assert!(e.encode(&node, "old".into()).is_err());
    }

    #[test]
    fn unions_try_members_in_order() {
        let e = CoercionEngine::new();
        let node = leaf(LeafType::Union(vec![
            TypeInfo::new(LeafType::Int32),
            TypeInfo::enumeration(["unbounded"]),
        ]));
        assert_eq!(e.encode(&node, "5".into()).unwrap(), TypedValue::Int32(5));
        assert_eq!(
            e.encode(&node, "unbounded".into()).unwrap(),
            TypedValue::Enum("unbounded".into())
        );
        assert!(matches!(
            e.encode(&node, "bounded".into()),
            Err(TypeError::UnparsableLiteral { .. })
        ));
        assert!(matches!(
            e.encode(&node, true.into()),
            Err(TypeError::IncompatibleKind { .. })
        ));
    }

    #[test]
    fn non_leaf_nodes_are_incompatible() {
        let e = CoercionEngine::new();
        let node = SchemaNode {
            kind: NodeKind::Container { presence: false },
            ..leaf(LeafType::String)
        };
        let err = e.encode(&node, "x".into()).unwrap_err();
        assert!(err.is_incompatible_kind());
        assert_eq!(err.path(), "/m:leaf");
    }

    #[test]
    fn decode_yields_declared_kind() {
        let e = CoercionEngine::new();
        assert_eq!(e.decode(&leaf(LeafType::Uint16), "61").unwrap(), TypedValue::Uint16(61));
        assert_eq!(
            e.decode(&leaf(LeafType::String), "61").unwrap(),
            TypedValue::String("61".into())
        );
    }

    #[test]
    fn check_revalidates_typed_values() {
        let e = CoercionEngine::new();
        let node = leaf_with(TypeInfo::new(LeafType::Uint16).with_range(60, 600));
        assert!(e.check(&node, &TypedValue::Uint16(61)).is_ok());
        assert!(e.check(&node, &TypedValue::Uint16(59)).is_err());
    }

    mod round_trip {
        use super::*;
        use proptest::prelude::*;

        fn assert_round_trip(node: &SchemaNode, raw: RawValue) -> Result<(), TestCaseError> {
            let e = CoercionEngine::new();
            let typed = e.encode(node, raw).map_err(|err| TestCaseError::fail(err.to_string()))?;
            let decoded = e
                .decode(node, &e.render(&typed))
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(decoded, typed);
            Ok(())
        }

        proptest! {
            #[test]
            fn int8(n in any::<i8>()) { assert_round_trip(&leaf(LeafType::Int8), n.into())?; }

            #[test]
            fn int64(n in any::<i64>()) { assert_round_trip(&leaf(LeafType::Int64), n.into())?; }

            #[test]
            fn uint16(n in any::<u16>()) { assert_round_trip(&leaf(LeafType::Uint16), n.into())?; }

            #[test]
            fn uint64(n in any::<u64>()) { assert_round_trip(&leaf(LeafType::Uint64), n.into())?; }

            #[test]
            fn boolean(b in any::<bool>()) { assert_round_trip(&leaf(LeafType::Bool), b.into())?; }

            #[test]
            fn string(s in ".*") { assert_round_trip(&leaf(LeafType::String), s.into())?; }

            #[test]
            fn binary(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
                assert_round_trip(&leaf(LeafType::Binary), bytes.into())?;
            }

            #[test]
            fn decimal(value in any::<i64>(), digits in 1u8..=18) {
                let d = Decimal64::new(value, digits).unwrap();
                assert_round_trip(&leaf(LeafType::Decimal { fraction_digits: digits }), d.into())?;
            }

            #[test]
            fn integer_text_is_canonicalized(n in any::<u16>()) {
                let e = CoercionEngine::new();
                let node = leaf(LeafType::Uint16);
                let from_text = e.encode(&node, format!("+{n}").into()).unwrap();
                prop_assert_eq!(from_text, e.encode(&node, n.into()).unwrap());
            }
        }
    }
}
