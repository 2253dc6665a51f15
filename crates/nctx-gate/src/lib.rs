//! Commit validation pipeline for nctx.
//!
//! Before a candidate datastore replaces the running configuration it
//! passes through the gate: a configurable pipeline of stages (types,
//! structure, leafref) that checks the whole candidate tree against the
//! schema and produces an accept/reject decision with the violations found.
//!
//! This is where deferred validation happens. Values the session staged
//! without local checks are typed here, and an edit is only as good as the
//! tree it leaves behind.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use nctx_gate::{CommitGate, GateConfig};
//! use nctx_schema::{PathResolver, StaticSchema};
//! use nctx_store::DataTree;
//!
//! let resolver = PathResolver::new(Arc::new(StaticSchema::new()));
//! let gate = CommitGate::with_default_stages(resolver, GateConfig::default());
//! let result = gate.evaluate(&DataTree::new()).unwrap();
//! assert!(result.is_accepted());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod stage;
pub mod stages;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{CommitGate, GateDecision, GateResult};
pub use stage::{GateContext, GateStage, StageDecision, StageResult, Violation};
pub use stages::{LeafRefStage, StructureStage, TypeStage};
