use serde::{Deserialize, Serialize};

/// Configuration for the commit validation pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When `true`, every candidate is accepted without running any stage.
    pub permissive: bool,
    /// Maximum number of violations one stage reports before it stops
    /// looking.
    pub max_violations: usize,
    /// Whether leafref targets must exist.
    pub require_leafref_instances: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            permissive: false,
            max_violations: 16,
            require_leafref_instances: true,
        }
    }
}

impl GateConfig {
    /// A configuration that accepts anything. Only useful for tests that
    /// need to plant invalid data in a datastore.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }
}
