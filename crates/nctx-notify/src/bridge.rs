use std::sync::Arc;

use nctx_coerce::CoercionEngine;
use nctx_schema::PathResolver;
use nctx_types::{DataPath, SchemaNode, TypedValue};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{NotifyError, NotifyResult};
use crate::event::{ChangeBatch, ChangeEvent, RawChange};
use crate::feed::ChangeFeed;

/// Configuration for the [`SubscriptionBridge`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity of each subscription's event queue.
    pub channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Turns the raw change feed into typed, subtree-filtered event streams.
#[derive(Clone)]
pub struct SubscriptionBridge {
    resolver: PathResolver,
    engine: CoercionEngine,
    feed: ChangeFeed,
    config: BridgeConfig,
}

impl SubscriptionBridge {
    pub fn new(resolver: PathResolver, engine: CoercionEngine, feed: ChangeFeed) -> Self {
        Self::with_config(resolver, engine, feed, BridgeConfig::default())
    }

    pub fn with_config(
        resolver: PathResolver,
        engine: CoercionEngine,
        feed: ChangeFeed,
        config: BridgeConfig,
    ) -> Self {
        Self {
            resolver,
            engine,
            feed,
            config,
        }
    }

    /// Subscribe to changes at or below `subtree`.
    ///
    /// The subtree is resolved like a read: list keys may be omitted and a
    /// trailing `/module:*` selects a whole module. Only changes committed
    /// after this call are delivered.
    pub fn subscribe(&self, subtree: &str) -> NotifyResult<Subscription> {
        let resolved = self.resolver.resolve_query(subtree)?;
        let id = Uuid::now_v7();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let forwarder = Forwarder {
            id,
            subtree: resolved.path.clone(),
            resolver: self.resolver.clone(),
            engine: self.engine.clone(),
        };
        let feed_rx = self.feed.subscribe_raw();
        let task = tokio::spawn(forwarder.run(feed_rx, tx));

        info!(subscription = %id, subtree = %resolved.path, "subscription registered");
        Ok(Subscription {
            id,
            subtree: resolved.path,
            rx,
            task,
        })
    }
}

/// A live subscription. Dropping it stops delivery.
pub struct Subscription {
    id: Uuid,
    subtree: DataPath,
    rx: mpsc::Receiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The resolved subtree this subscription watches.
    pub fn subtree(&self) -> &DataPath {
        &self.subtree
    }

    /// Wait for the next event. Returns `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// The next event if one is already queued.
    pub fn try_recv(&mut self) -> NotifyResult<Option<ChangeEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(NotifyError::Closed),
        }
    }

    /// Stop delivery. Events already queued are discarded.
    pub fn cancel(self) {
        debug!(subscription = %self.id, "subscription cancelled");
        // Drop does the rest.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Forwarding task
// ---------------------------------------------------------------------------

struct Forwarder {
    id: Uuid,
    subtree: DataPath,
    resolver: PathResolver,
    engine: CoercionEngine,
}

impl Forwarder {
    async fn run(
        self,
        mut feed: broadcast::Receiver<Arc<ChangeBatch>>,
        tx: mpsc::Sender<ChangeEvent>,
    ) {
        loop {
            let batch = match feed.recv().await {
                Ok(batch) => batch,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(subscription = %self.id, skipped, "subscriber lagged behind the change feed");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            for change in &batch.changes {
                let Some(event) = self.translate(&batch, change) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    debug!(subscription = %self.id, "subscriber went away");
                    return;
                }
            }
        }
        debug!(subscription = %self.id, "change feed closed");
    }

    fn translate(&self, batch: &ChangeBatch, change: &RawChange) -> Option<ChangeEvent> {
        let path = match DataPath::parse(&change.path) {
            Ok(path) => path,
            Err(e) => {
                warn!(subscription = %self.id, path = %change.path, error = %e, "unparsable change path");
                return None;
            }
        };
        if !path.matches(&self.subtree) {
            return None;
        }
        let node = self.resolver.node_for(&path);
        Some(ChangeEvent {
            sequence: batch.sequence,
            session_id: batch.session_id,
            committed_at: batch.committed_at,
            path: change.path.clone(),
            operation: change.operation,
            old_value: self.decode(node.as_deref(), &change.path, change.old_literal.as_deref()),
            new_value: self.decode(node.as_deref(), &change.path, change.new_literal.as_deref()),
        })
    }

    fn decode(&self, node: Option<&SchemaNode>, path: &str, literal: Option<&str>) -> Option<TypedValue> {
        let (node, literal) = (node?, literal?);
        match self.engine.decode(node, literal) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(subscription = %self.id, path, error = %e, "change value doesn't decode");
                None
            }
        }
    }
}
