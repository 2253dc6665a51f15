//! Change subscriptions for nctx.
//!
//! The backend announces every successful commit on a [`ChangeFeed`] as a
//! [`ChangeBatch`] of untyped [`RawChange`]s. A [`SubscriptionBridge`] lets
//! callers register interest in one schema subtree and receive the matching
//! changes as [`ChangeEvent`]s, with old and new values decoded by the same
//! coercion engine sessions use for reads.
//!
//! Delivery is best-effort: a subscriber that falls behind the feed's
//! buffer skips the batches it missed, and a warning is logged.

pub mod bridge;
pub mod error;
pub mod event;
pub mod feed;

pub use bridge::{BridgeConfig, Subscription, SubscriptionBridge};
pub use error::{NotifyError, NotifyResult};
pub use event::{ChangeBatch, ChangeEvent, ChangeOperation, RawChange};
pub use feed::ChangeFeed;
