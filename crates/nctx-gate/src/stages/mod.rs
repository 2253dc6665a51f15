//! Built-in gate stages.

pub mod leafref;
pub mod structure;
pub mod types;

pub use leafref::LeafRefStage;
pub use structure::StructureStage;
pub use types::TypeStage;
