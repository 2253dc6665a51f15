//! In-memory data tree for nctx.
//!
//! A [`DataTree`] holds one datastore's content as a flat map from canonical
//! data path to [`StoredNode`]. Values are kept as the backend keeps them,
//! in canonical lexical form; typing them is the coercion layer's job.
//!
//! Non-presence containers are implicit and never stored: they exist
//! exactly when something below them does.

pub mod diff;
pub mod error;
pub mod node;
pub mod tree;

pub use diff::{diff_trees, NodeChange, TreeDiff};
pub use error::{StoreError, StoreResult};
pub use node::{StoredKind, StoredNode};
pub use tree::DataTree;
