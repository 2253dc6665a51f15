use nctx_store::DataTree;
use nctx_types::{LeafType, SchemaNode};

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, Violation};

/// Referential integrity stage.
///
/// The value of every leafref leaf must equal the value of some existing
/// instance of the referenced leaf.
pub struct LeafRefStage;

impl GateStage for LeafRefStage {
    fn name(&self) -> &str {
        "leafref"
    }

    fn evaluate(
        &self,
        tree: &DataTree,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let mut found = Vec::new();

        for stored in tree.iter().filter(|n| n.has_value()) {
            if context.is_saturated(&found) {
                break;
            }
            let Some(node) = context.resolver.node_for(&stored.path) else {
                continue;
            };
            let Some(target) = leafref_target(&node) else {
                continue;
            };

            let resolved = context.resolver.resolve_query(target).map_err(|e| {
                GateError::stage(self.name(), format!("{}: bad leafref target: {e}", node.path))
            })?;
            let Some(target_node) = resolved.node.clone() else {
                return Err(GateError::stage(
                    self.name(),
                    format!("{}: leafref target {target} is not a leaf", node.path),
                ));
            };

            let literal = stored.literal.as_deref().unwrap_or_default();
            let Ok(wanted) = context.engine.decode(&target_node, literal) else {
                // Left for the types stage to report.
                continue;
            };
            let target_schema_path = resolved.schema_path();
            let exists = tree
                .iter()
                .filter(|n| n.has_value() && n.schema_path() == target_schema_path)
                .filter_map(|n| n.literal.as_deref())
                .any(|candidate| {
                    context
                        .engine
                        .decode(&target_node, candidate)
                        .is_ok_and(|value| value == wanted)
                });

            if !exists {
                found.push(Violation::new(
                    self.name(),
                    stored.key(),
                    format!("required instance {target} with value '{literal}' doesn't exist"),
                ));
            }
        }

        Ok(StageDecision::from_violations(found))
    }
}

fn leafref_target(node: &SchemaNode) -> Option<&str> {
    match &node.type_info()?.leaf_type {
        LeafType::LeafRef { target, .. } => Some(target),
        _ => None,
    }
}
