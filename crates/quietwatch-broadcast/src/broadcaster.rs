//! The composite status broadcaster.
//!
//! All mutation runs under one lock: the subscriber map, the merge
//! state, the live feeds, and the delivery queue. Events from both
//! feeds funnel through [`handle_event`], the single serialized merge
//! step. User callbacks are never invoked with the lock held; pending
//! deliveries are queued and drained by whichever thread got there
//! first, so `subscribe`/`cancel` called from inside a callback cannot
//! deadlock.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use quietwatch_core::{AudioStatus, MergeOutcome, MergeState, SourceError, StatusEvent};
use quietwatch_probe::{MuteProbe, ProbeHandle, VerdictCallback};

use crate::source::{LevelCallback, LevelSource};
use crate::stream::StatusStream;
use crate::subscription::SubscriptionToken;

/// What a subscriber receives: a changed composite status, or the one
/// terminal error.
pub type StatusUpdate = Result<AudioStatus, SourceError>;

/// Subscriber callback.
pub type StatusCallback = Arc<dyn Fn(StatusUpdate) + Send + Sync>;

/// Both live feeds of one active period.
struct ActiveFeeds {
    level_stop: tokio_util::sync::CancellationToken,
    probe: ProbeHandle,
}

impl ActiveFeeds {
    fn stop(self) {
        self.level_stop.cancel();
        self.probe.stop();
    }
}

/// Everything guarded by the broadcaster lock.
pub(crate) struct Inner {
    next_id: u64,
    /// Ids are assigned monotonically, so iteration order is
    /// registration order.
    subscribers: BTreeMap<u64, StatusCallback>,
    merge: MergeState,
    /// `Some` iff subscriber count > 0 on a non-terminal broadcaster.
    feeds: Option<ActiveFeeds>,
    /// Bumped at every feed start and teardown. Events tagged with a
    /// stale epoch come from a feed already torn down and are dropped.
    epoch: u64,
    /// Pending deliveries, drained with the lock released.
    queue: VecDeque<(u64, StatusUpdate)>,
    /// Whether some thread currently owns the drain loop.
    draining: bool,
}

/// Shared, deduplicated, multi-subscriber composite status feed.
///
/// Owns one [`LevelSource`] subscription and one [`MuteProbe`] loop,
/// both started when the subscriber count goes 0→1 and stopped when it
/// returns to 0. A terminal source error stops both immediately and is
/// cached; see [`StatusBroadcaster::subscribe`].
pub struct StatusBroadcaster {
    inner: Arc<Mutex<Inner>>,
    source: Arc<dyn LevelSource>,
    probe: MuteProbe,
}

impl StatusBroadcaster {
    pub fn new(source: Arc<dyn LevelSource>, probe: MuteProbe) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                subscribers: BTreeMap::new(),
                merge: MergeState::new(),
                feeds: None,
                epoch: 0,
                queue: VecDeque::new(),
                draining: false,
            })),
            source,
            probe,
        }
    }

    /// Register a callback for composite status changes.
    ///
    /// The first subscriber starts both feeds; side effects begin here,
    /// not at construction. A late joiner receives the cached status (or
    /// the cached terminal error) before any new update. Cancellation is
    /// explicit through the returned token; dropping the token does not
    /// cancel.
    pub fn subscribe(&self, callback: StatusCallback) -> SubscriptionToken {
        let (id, start) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, callback);

            // Replays go through the same queue as live updates, so a
            // late joiner's first delivery is totally ordered with them.
            let replay: Option<StatusUpdate> = match inner.merge.terminal_error() {
                Some(err) => Some(Err(err.clone())),
                None => inner.merge.last().map(Ok),
            };
            if let Some(update) = replay {
                inner.queue.push_back((id, update));
            }

            let start = if inner.subscribers.len() == 1 && !inner.merge.is_terminal() {
                inner.epoch += 1;
                Some(inner.epoch)
            } else {
                None
            };
            debug!(
                subscriber_id = id,
                count = inner.subscribers.len(),
                "subscriber added"
            );
            (id, start)
        };

        // Feeds start with the lock released: a source implementation
        // may push synchronously from inside subscribe().
        if let Some(epoch) = start {
            let feeds = self.start_feeds(epoch);
            self.store_feeds(epoch, feeds);
        }

        drain(&self.inner);
        SubscriptionToken::new(id, Arc::clone(&self.inner))
    }

    /// Subscribe as a cancellable async sequence instead of a callback.
    pub fn stream(&self) -> StatusStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.subscribe(Arc::new(move |update| {
            // Ignore send errors; the stream side may already be gone.
            let _ = tx.send(update);
        }));
        StatusStream::new(rx, token)
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Last computed status, delivered or suppressed.
    pub fn last_status(&self) -> Option<AudioStatus> {
        self.inner.lock().merge.last()
    }

    /// True once a terminal source error has been processed.
    pub fn is_terminal(&self) -> bool {
        self.inner.lock().merge.is_terminal()
    }

    fn start_feeds(&self, epoch: u64) -> ActiveFeeds {
        debug!(epoch, "starting level feed and probe loop");

        let level_cb: LevelCallback = {
            let inner = Arc::clone(&self.inner);
            Arc::new(move |result| match result {
                Ok(sample) => handle_event(&inner, epoch, StatusEvent::LevelChanged(sample.level)),
                Err(err) => handle_event(&inner, epoch, StatusEvent::SourceFailed(err)),
            })
        };
        let level_stop = self.source.subscribe(level_cb);

        let verdict_cb: VerdictCallback = {
            let inner = Arc::clone(&self.inner);
            Arc::new(move |muted| handle_event(&inner, epoch, StatusEvent::MuteChanged(muted)))
        };
        let probe = self.probe.start(verdict_cb);

        ActiveFeeds { level_stop, probe }
    }

    fn store_feeds(&self, epoch: u64, feeds: ActiveFeeds) {
        let obsolete = {
            let mut inner = self.inner.lock();
            if inner.epoch == epoch && !inner.subscribers.is_empty() && inner.feeds.is_none() {
                inner.feeds = Some(feeds);
                None
            } else {
                // The world moved on while the feeds were starting:
                // every subscriber already cancelled, or the source
                // failed synchronously during its own subscribe().
                Some(feeds)
            }
        };
        if let Some(feeds) = obsolete {
            debug!(epoch, "feeds obsolete before store, stopping");
            feeds.stop();
        }
    }
}

/// Apply one feed event through the serialized merge step and fan the
/// result out to the delivery queue.
fn handle_event(inner: &Arc<Mutex<Inner>>, epoch: u64, event: StatusEvent) {
    let torn_down = {
        let mut guard = inner.lock();
        if guard.epoch != epoch {
            // The feed outlived its teardown; nothing from it may
            // surface.
            trace!(epoch, current = guard.epoch, "stale feed event dropped");
            return;
        }
        match guard.merge.apply(event) {
            MergeOutcome::Changed(status) => {
                debug!(%status, "composite status changed, delivering");
                let ids: Vec<u64> = guard.subscribers.keys().copied().collect();
                for id in ids {
                    guard.queue.push_back((id, Ok(status)));
                }
                None
            }
            MergeOutcome::Unchanged(status) => {
                trace!(%status, "composite status unchanged, suppressed");
                None
            }
            MergeOutcome::Failed(err) => {
                warn!(error = %err, "level source failed, stream is terminal");
                let ids: Vec<u64> = guard.subscribers.keys().copied().collect();
                for id in ids {
                    guard.queue.push_back((id, Err(err.clone())));
                }
                // Termination stops both feeds at once; the epoch bump
                // fences off their in-flight events.
                guard.epoch += 1;
                guard.feeds.take()
            }
            MergeOutcome::Discarded => None,
        }
    };
    if let Some(feeds) = torn_down {
        feeds.stop();
    }
    drain(inner);
}

/// Remove subscriber `id`; tear the feeds down on the 1→0 transition.
pub(crate) fn cancel_subscriber(inner: &Arc<Mutex<Inner>>, id: u64) {
    let torn_down = {
        let mut guard = inner.lock();
        if guard.subscribers.remove(&id).is_none() {
            return;
        }
        debug!(
            subscriber_id = id,
            count = guard.subscribers.len(),
            "subscriber removed"
        );
        if guard.subscribers.is_empty() {
            guard.epoch += 1;
            guard.feeds.take()
        } else {
            None
        }
    };
    if let Some(feeds) = torn_down {
        debug!("last subscriber gone, stopping feeds");
        feeds.stop();
    }
}

/// Drain the delivery queue, invoking callbacks with the lock released.
///
/// Exactly one thread drains at a time. Re-entrant calls find `draining`
/// set, enqueue their work, and return; the active drainer picks it up.
/// Callbacks are re-resolved by id at delivery time, so a subscriber
/// cancelled between enqueue and drain is skipped.
fn drain(inner: &Arc<Mutex<Inner>>) {
    {
        let mut guard = inner.lock();
        if guard.draining || guard.queue.is_empty() {
            return;
        }
        guard.draining = true;
    }
    loop {
        let next = {
            let mut guard = inner.lock();
            let Some((id, update)) = guard.queue.pop_front() else {
                guard.draining = false;
                return;
            };
            guard.subscribers.get(&id).cloned().map(|cb| (cb, update))
        };
        if let Some((cb, update)) = next {
            // Subscriber panics must not take the drainer down with
            // them.
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(update))).is_err() {
                warn!("subscriber callback panicked");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
