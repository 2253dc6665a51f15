use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a successful commit reports back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Client-side id for this transaction, for correlating logs.
    pub transaction_id: Uuid,
    /// Number of edits sent; zero when there was nothing to commit.
    pub edits: usize,
    pub committed_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl CommitReceipt {
    pub fn new(edits: usize, elapsed: Duration) -> Self {
        Self {
            transaction_id: Uuid::now_v7(),
            edits,
            committed_at: Utc::now(),
            elapsed,
        }
    }

    /// A commit with nothing staged.
    pub fn empty() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.edits == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_have_distinct_ids() {
        let a = CommitReceipt::new(3, Duration::from_millis(2));
        let b = CommitReceipt::empty();
        assert_ne!(a.transaction_id, b.transaction_id);
        assert!(!a.is_empty());
        assert!(b.is_empty());
    }
}
