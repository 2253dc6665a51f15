//! Summary of what a buffer holds.
//!
//! Useful for logging before a commit and for callers that want to show
//! the pending change set without walking it.

use serde::{Deserialize, Serialize};

use crate::edit::{EditOperation, PendingEdit};

/// Per-operation counts over a set of pending edits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSummary {
    pub sets: usize,
    pub creates: usize,
    pub deletes: usize,
    pub list_entries_created: usize,
    pub list_entries_removed: usize,
    pub moves: usize,
    /// Edits whose value check was left to the backend.
    pub deferred: usize,
}

impl BufferSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of edits counted.
    pub fn total(&self) -> usize {
        self.sets
            + self.creates
            + self.deletes
            + self.list_entries_created
            + self.list_entries_removed
            + self.moves
    }

    /// Returns `true` if nothing is pending.
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    pub(crate) fn record(&mut self, edit: &PendingEdit) {
        match edit.operation {
            EditOperation::Set => self.sets += 1,
            EditOperation::Create => self.creates += 1,
            EditOperation::Delete => self.deletes += 1,
            EditOperation::CreateListEntry => self.list_entries_created += 1,
            EditOperation::RemoveListEntry => self.list_entries_removed += 1,
            EditOperation::Move => self.moves += 1,
        }
        if edit.value.is_deferred() {
            self.deferred += 1;
        }
    }
}
