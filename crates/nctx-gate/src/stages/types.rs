use nctx_store::DataTree;

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, Violation};

/// Value typing stage.
///
/// Every leaf and leaf-list value must belong to a configuration node of
/// the schema and decode under that node's type and restrictions.
pub struct TypeStage;

impl GateStage for TypeStage {
    fn name(&self) -> &str {
        "types"
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
            let path = stored.key();
            let Some(node) = context.resolver.node_for(&stored.path) else {
                found.push(Violation::new(self.name(), path, "no such node in the schema"));
                continue;
            };
            if !node.config {
                found.push(Violation::new(self.name(), path, "state data cannot be configured"));
                continue;
            }
            let literal = stored.literal.as_deref().unwrap_or_default();
            if let Err(e) = context.engine.decode(&node, literal) {
                found.push(Violation::new(self.name(), path, e.to_string()));
            }
        }

        Ok(StageDecision::from_violations(found))
    }
}
