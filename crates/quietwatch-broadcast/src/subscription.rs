//! Explicit subscription cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::broadcaster::{Inner, cancel_subscriber};

/// Handle for one registered subscriber.
///
/// Cancellation is always explicit: dropping the token leaves the
/// subscription live. This keeps a broadcaster shared across owners
/// honest about who is still listening.
pub struct SubscriptionToken {
    id: u64,
    inner: Arc<Mutex<Inner>>,
    cancelled: AtomicBool,
}

impl SubscriptionToken {
    pub(crate) fn new(id: u64, inner: Arc<Mutex<Inner>>) -> Self {
        Self {
            id,
            inner,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Remove this subscriber. Safe to call repeatedly; only the first
    /// call does anything. If this was the last subscriber, both feeds
    /// stop before new work is accepted.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            cancel_subscriber(&self.inner, self.id);
        }
    }

    /// Whether `cancel` has been called on this token.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
