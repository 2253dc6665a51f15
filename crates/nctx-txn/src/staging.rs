//! Local validation policy applied when a value is staged.

use nctx_coerce::{CoerceResult, CoercionEngine, RawValue};
use nctx_types::SchemaNode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::StagedValue;

/// How much of the type check happens at staging time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Only kind mismatches fail at staging. Unparsable literals and
    /// constraint violations are staged as-is and left to the backend,
    /// surfacing as a commit failure.
    #[default]
    Deferred,
    /// Every coercion failure fails at staging.
    Strict,
}

/// Coerce `raw` for `node` and decide what gets staged.
pub fn prepare(
    engine: &CoercionEngine,
    node: &SchemaNode,
    raw: RawValue,
    mode: ValidationMode,
) -> CoerceResult<StagedValue> {
    let literal = raw.to_literal();
    match engine.encode(node, raw) {
        Ok(value) => Ok(StagedValue::Typed(value)),
        Err(e) if e.is_incompatible_kind() => Err(e),
        Err(e) => match mode {
            ValidationMode::Strict => Err(e),
            ValidationMode::Deferred => {
                debug!(path = %node.path, literal = %literal, error = %e, "validation deferred to commit");
                Ok(StagedValue::Deferred {
                    literal,
                    reason: e.to_string(),
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nctx_coerce::TypeError;
    use nctx_types::{LeafType, NodeKind, TypeInfo, TypedValue};

    fn hello_timeout() -> SchemaNode {
        SchemaNode {
            path: "/ietf-netconf-server:netconf-server/ietf-netconf-server:hello-timeout".into(),
            module: "ietf-netconf-server".into(),
            name: "hello-timeout".into(),
            kind: NodeKind::Leaf(TypeInfo::new(LeafType::Uint16).into()),
            config: true,
            description: None,
            user_ordered: false,
        }
    }

    #[test]
    fn valid_values_are_typed() {
        let staged = prepare(
            &CoercionEngine::new(),
            &hello_timeout(),
            "61".into(),
            ValidationMode::Deferred,
        )
        .unwrap();
        assert_eq!(staged, StagedValue::Typed(TypedValue::Uint16(61)));
    }

    #[test]
    fn deferred_mode_stages_unparsable_text() {
        let staged = prepare(
            &CoercionEngine::new(),
            &hello_timeout(),
            "blesmrt".into(),
            ValidationMode::Deferred,
        )
        .unwrap();
        match staged {
            StagedValue::Deferred { literal, reason } => {
                assert_eq!(literal, "blesmrt");
                assert!(reason.contains("uint16"), "{reason}");
            }
            other => panic!("expected deferred, got {other:?}"),
        }
    }

    #[test]
    fn deferred_mode_stages_out_of_range_numbers() {
        let staged = prepare(
            &CoercionEngine::new(),
            &hello_timeout(),
            70000.into(),
            ValidationMode::Deferred,
        )
        .unwrap();
        assert_eq!(staged.literal().as_deref(), Some("70000"));
    }

    #[test]
    fn strict_mode_fails_fast() {
        let err = prepare(
            &CoercionEngine::new(),
            &hello_timeout(),
            "blesmrt".into(),
            ValidationMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, TypeError::UnparsableLiteral { .. }));
    }

    #[test]
    fn kind_mismatch_fails_in_every_mode() {
        for mode in [ValidationMode::Deferred, ValidationMode::Strict] {
            let err = prepare(
                &CoercionEngine::new(),
                &hello_timeout(),
                serde_json::json!({"nested": true}).into(),
                mode,
            )
            .unwrap_err();
            assert!(err.is_incompatible_kind());
        }
    }

    #[test]
    fn default_mode_is_deferred() {
        assert_eq!(ValidationMode::default(), ValidationMode::Deferred);
    }
}
