use std::fmt;
use std::time::{Duration, Instant};

use nctx_coerce::CoercionEngine;
use nctx_schema::PathResolver;
use nctx_store::DataTree;
use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageResult, Violation};
use crate::stages::{LeafRefStage, StructureStage, TypeStage};

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

/// Final verdict on a candidate tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    /// Rejected by the named stage.
    Rejected { stage: String },
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "Accepted"),
            Self::Rejected { stage } => write!(f, "Rejected by {stage}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GateResult
// ---------------------------------------------------------------------------

/// The outcome of running a candidate through the full pipeline.
#[derive(Clone, Debug)]
pub struct GateResult {
    pub decision: GateDecision,
    /// Violations reported by the rejecting stage; empty when accepted.
    pub violations: Vec<Violation>,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl GateResult {
    pub fn is_accepted(&self) -> bool {
        self.decision == GateDecision::Accepted
    }
}

// ---------------------------------------------------------------------------
// CommitGate
// ---------------------------------------------------------------------------

/// A configurable pipeline of stages every candidate datastore passes
/// through before it replaces the running configuration.
pub struct CommitGate {
    stages: Vec<Box<dyn GateStage>>,
    config: GateConfig,
    resolver: PathResolver,
    engine: CoercionEngine,
}

impl CommitGate {
    /// Create a gate with an empty pipeline.
    pub fn new(resolver: PathResolver, config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
            resolver,
            engine: CoercionEngine::new(),
        }
    }

    /// Create a gate with the default pipeline: types -> structure -> leafref.
    ///
    /// The leafref stage is left out when the configuration does not
    /// require leafref instances.
    pub fn with_default_stages(resolver: PathResolver, config: GateConfig) -> Self {
        let check_leafrefs = config.require_leafref_instances;
        let mut gate = Self::new(resolver, config);
        gate.add_stage(Box::new(TypeStage));
        gate.add_stage(Box::new(StructureStage));
        if check_leafrefs {
            gate.add_stage(Box::new(LeafRefStage));
        }
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate a candidate tree.
    ///
    /// The pipeline is **fail-fast**: the first stage that reports
    /// violations stops evaluation with a `Rejected` decision.
    pub fn evaluate(&self, tree: &DataTree) -> Result<GateResult, GateError> {
        let pipeline_start = Instant::now();

        if self.config.permissive {
            return Ok(GateResult {
                decision: GateDecision::Accepted,
                violations: Vec::new(),
                stage_results: Vec::new(),
                elapsed: pipeline_start.elapsed(),
            });
        }
        if self.config.max_violations == 0 {
            return Err(GateError::Config("max_violations must be at least 1".into()));
        }

        let context = GateContext {
            resolver: &self.resolver,
            engine: &self.engine,
            config: &self.config,
        };
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(tree, &context)?;
            let violations = match decision {
                StageDecision::Pass => Vec::new(),
                StageDecision::Fail { violations } => violations,
            };

            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: violations.is_empty(),
                violations: violations.len(),
                elapsed: stage_start.elapsed(),
            });

            if !violations.is_empty() {
                debug!(
                    stage = stage.name(),
                    violations = violations.len(),
                    first = %violations[0],
                    "candidate rejected"
                );
                return Ok(GateResult {
                    decision: GateDecision::Rejected {
                        stage: stage.name().to_string(),
                    },
                    violations,
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        debug!(nodes = tree.len(), stages = stage_results.len(), "candidate accepted");
        Ok(GateResult {
            decision: GateDecision::Accepted,
            violations: Vec::new(),
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }
}
