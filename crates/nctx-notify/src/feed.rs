use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::{ChangeBatch, RawChange};

/// Broadcast source of committed changes.
///
/// Cloning yields another handle to the same feed; sequence numbers are
/// shared between clones.
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Arc<ChangeBatch>>,
    sequence: Arc<AtomicU64>,
}

impl ChangeFeed {
    /// Create a feed that buffers up to `capacity` batches per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Announce one commit. Returns the batch's sequence number. Commits
    /// that changed nothing are not announced and return `None`.
    pub fn publish(&self, session_id: u32, changes: Vec<RawChange>) -> Option<u64> {
        if changes.is_empty() {
            return None;
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let batch = ChangeBatch {
            sequence,
            committed_at: Utc::now(),
            session_id,
            changes,
        };
        let changes = batch.changes.len();
        match self.sender.send(Arc::new(batch)) {
            Ok(receivers) => debug!(sequence, changes, receivers, "change batch published"),
            Err(_) => debug!(sequence, changes, "change batch published with no subscribers"),
        }
        Some(sequence)
    }

    /// A receiver for every batch published from now on.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<Arc<ChangeBatch>> {
        self.sender.subscribe()
    }

    /// Sequence number of the last published batch (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}
