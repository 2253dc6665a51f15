//! The [`TransactionBuffer`]: staged edits keyed by canonical path.
//!
//! Edits are held in a `Vec` in first-staged order with a `BTreeMap` index
//! from canonical path to slot. Re-staging a path drops the earlier edit
//! and appends the new one, so the last write wins and lands after every
//! edit staged before it. A later write must also outrank an earlier
//! ancestor delete.

use std::collections::BTreeMap;

use tracing::debug;

use nctx_types::DataPath;

use crate::edit::PendingEdit;
use crate::error::{TxnError, TxnResult};
use crate::status::BufferSummary;

/// Ordered, keyed accumulation of pending edits for one session.
#[derive(Clone, Debug, Default)]
pub struct TransactionBuffer {
    edits: Vec<PendingEdit>,
    slots: BTreeMap<String, usize>,
}

impl TransactionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending edits (distinct paths).
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    // ---------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------

    /// Stage an edit, replacing any earlier edit to the same path.
    ///
    /// Returns the replaced edit, if any. The path must address one
    /// concrete node: the root and wildcard paths are rejected.
    pub fn stage(&mut self, edit: PendingEdit) -> TxnResult<Option<PendingEdit>> {
        let key = edit.key();
        if edit.path.is_root() {
            return Err(TxnError::InvalidPath {
                path: key,
                reason: "the root cannot be edited".into(),
            });
        }
        if edit.path.has_wildcard() {
            return Err(TxnError::InvalidPath {
                path: key,
                reason: "wildcards cannot be edited".into(),
            });
        }
        let anchor = edit.position.as_ref().and_then(|p| p.anchor_path(&edit.path));
        let unquotable = edit
            .path
            .unquotable_value()
            .or_else(|| anchor.as_ref().and_then(DataPath::unquotable_value));
        if let Some(value) = unquotable {
            return Err(TxnError::InvalidPath {
                path: key,
                reason: format!("predicate value {value:?} holds both quote characters"),
            });
        }

        debug!(path = %key, operation = %edit.operation, "edit staged");
        let previous = self.slots.remove(&key).map(|slot| {
            let previous = self.edits.remove(slot);
            for index in self.slots.values_mut() {
                if *index > slot {
                    *index -= 1;
                }
            }
            debug!(path = %key, previous = %previous.operation, "earlier edit replaced");
            previous
        });
        self.slots.insert(key, self.edits.len());
        self.edits.push(edit);
        Ok(previous)
    }

    // ---------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------

    /// The pending edit for a canonical path.
    pub fn get(&self, path: &str) -> Option<&PendingEdit> {
        self.slots.get(path).map(|&slot| &self.edits[slot])
    }

    /// Pending edits in staging order, one per path.
    pub fn diff(&self) -> Vec<PendingEdit> {
        self.edits.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEdit> {
        self.edits.iter()
    }

    pub fn summary(&self) -> BufferSummary {
        let mut summary = BufferSummary::new();
        for edit in &self.edits {
            summary.record(edit);
        }
        summary
    }

    // ---------------------------------------------------------------
    // Reset
    // ---------------------------------------------------------------

    /// Drop every pending edit.
    pub fn clear(&mut self) {
        if !self.edits.is_empty() {
            debug!(edits = self.edits.len(), "buffer cleared");
        }
        self.edits.clear();
        self.slots.clear();
    }
}
