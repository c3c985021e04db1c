//! Async sequence view over a subscription.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::broadcaster::StatusUpdate;
use crate::subscription::SubscriptionToken;

/// Subscription adapted to `async` consumption.
///
/// Yields every delivery the underlying subscriber would receive,
/// including the late-joiner replay. A terminal error is yielded once
/// and fuses the stream; the subscription is cancelled at that point
/// since nothing further can arrive. Unlike a bare
/// [`SubscriptionToken`], dropping the stream cancels.
pub struct StatusStream {
    rx: mpsc::UnboundedReceiver<StatusUpdate>,
    token: SubscriptionToken,
    done: bool,
}

impl StatusStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<StatusUpdate>, token: SubscriptionToken) -> Self {
        Self {
            rx,
            token,
            done: false,
        }
    }

    /// Next update, or `None` once the stream has finished.
    pub async fn recv(&mut self) -> Option<StatusUpdate> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(update) => {
                if update.is_err() {
                    self.finish();
                }
                Some(update)
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    /// Release the subscriber slot and fuse the stream.
    fn finish(&mut self) {
        self.done = true;
        self.token.cancel();
    }
}

impl Stream for StatusStream {
    type Item = StatusUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(update)) => {
                if update.is_err() {
                    this.finish();
                }
                Poll::Ready(Some(update))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use quietwatch_core::{AudioStatus, LevelSample, SourceError};
    use quietwatch_probe::{ForegroundGate, MuteProbe, ProbeConfig, ProbeError, Prober};

    use crate::broadcaster::StatusBroadcaster;
    use crate::source::{LevelCallback, LevelSource};

    struct PushSource {
        callback: Mutex<Option<LevelCallback>>,
        token: Mutex<Option<CancellationToken>>,
    }

    impl PushSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                callback: Mutex::new(None),
                token: Mutex::new(None),
            })
        }

        fn push_level(&self, level: f64) {
            let cb = self.callback.lock().clone();
            if let Some(cb) = cb {
                cb(Ok(LevelSample::now(level)));
            }
        }

        fn push_error(&self, msg: &str) {
            let cb = self.callback.lock().clone();
            if let Some(cb) = cb {
                cb(Err(SourceError::new(msg)));
            }
        }

        fn is_stopped(&self) -> bool {
            self.token
                .lock()
                .as_ref()
                .is_some_and(|t| t.is_cancelled())
        }
    }

    impl LevelSource for PushSource {
        fn subscribe(&self, callback: LevelCallback) -> CancellationToken {
            *self.callback.lock() = Some(callback);
            let token = CancellationToken::new();
            *self.token.lock() = Some(token.clone());
            token
        }
    }

    struct InstantProber;

    #[async_trait]
    impl Prober for InstantProber {
        async fn ping(&self) -> Result<(), ProbeError> {
            Ok(())
        }
    }

    struct BackgroundedGate;

    #[async_trait]
    impl ForegroundGate for BackgroundedGate {
        async fn is_backgrounded(&self) -> bool {
            true
        }
    }

    fn inert_probe() -> MuteProbe {
        MuteProbe::new(
            Arc::new(InstantProber),
            Arc::new(BackgroundedGate),
            ProbeConfig::default().with_interval(Duration::from_secs(3600)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_updates_in_order() {
        let source = PushSource::new();
        let caster = StatusBroadcaster::new(source.clone(), inert_probe());
        let mut stream = caster.stream();

        source.push_level(0.3);
        source.push_level(0.6);

        assert_eq!(stream.recv().await, Some(Ok(AudioStatus::new(0.3, false))));
        assert_eq!(stream.recv().await, Some(Ok(AudioStatus::new(0.6, false))));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_starts_with_replay_for_late_joiner() {
        let source = PushSource::new();
        let caster = StatusBroadcaster::new(source.clone(), inert_probe());
        let _first = caster.stream();

        source.push_level(0.3);

        let mut late = caster.stream();
        assert_eq!(late.recv().await, Some(Ok(AudioStatus::new(0.3, false))));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_fuses_the_stream() {
        let source = PushSource::new();
        let caster = StatusBroadcaster::new(source.clone(), inert_probe());
        let mut stream = caster.stream();

        source.push_level(0.3);
        source.push_error("device yanked");

        assert_eq!(stream.recv().await, Some(Ok(AudioStatus::new(0.3, false))));
        assert_eq!(
            stream.recv().await,
            Some(Err(SourceError::new("device yanked")))
        );
        assert_eq!(stream.recv().await, None, "fused after the error");
        assert_eq!(caster.subscriber_count(), 0, "slot released");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_cancels_the_subscription() {
        let source = PushSource::new();
        let caster = StatusBroadcaster::new(source.clone(), inert_probe());

        let stream = caster.stream();
        assert_eq!(caster.subscriber_count(), 1);

        drop(stream);
        assert_eq!(caster.subscriber_count(), 0);
        assert!(source.is_stopped());
    }
}
