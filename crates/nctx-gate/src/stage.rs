use std::fmt;
use std::time::Duration;

use nctx_coerce::CoercionEngine;
use nctx_schema::PathResolver;
use nctx_store::DataTree;
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::error::GateError;

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// One schema rule broken by a candidate data tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the stage that found it.
    pub stage: String,
    /// Canonical path of the offending node.
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(stage: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// Proceed to the next stage.
    Pass,
    /// The candidate must be rejected.
    Fail { violations: Vec<Violation> },
}

impl StageDecision {
    /// `Pass` when nothing was found, `Fail` otherwise.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Pass
        } else {
            Self::Fail { violations }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    /// Number of violations the stage reported.
    pub violations: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Everything a stage may consult besides the tree under test.
pub struct GateContext<'a> {
    pub resolver: &'a PathResolver,
    pub engine: &'a CoercionEngine,
    pub config: &'a GateConfig,
}

impl GateContext<'_> {
    /// Returns `true` once a stage has collected as many violations as it
    /// is allowed to report.
    pub fn is_saturated(&self, found: &[Violation]) -> bool {
        found.len() >= self.config.max_violations
    }
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the commit pipeline.
///
/// Stages run in order against the complete candidate tree. They must not
/// assume that earlier stages passed unless the pipeline is fail-fast, which
/// the built-in [`CommitGate`](crate::CommitGate) is.
pub trait GateStage: Send + Sync {
    /// Short name of this stage (e.g. "types", "leafref").
    fn name(&self) -> &str;

    fn evaluate(&self, tree: &DataTree, context: &GateContext<'_>)
        -> Result<StageDecision, GateError>;
}
