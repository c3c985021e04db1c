//! The probe loop: one immediate probe on start, then one per tick.
//!
//! Verdict rules, applied per cycle:
//!
//! - Backgrounded host → skip entirely, no timing, no verdict.
//! - `elapsed < threshold` (strict) → muted. Exactly the threshold is
//!   **not** muted.
//! - Probe failure → "not muted" for that cycle; the loop keeps going.
//! - A cycle that overruns the interval defers the next probe by one
//!   full period; missed ticks never burst into catch-up probes.
//!
//! Every completed probe reports its verdict; collapsing repeated equal
//! verdicts is the consumer's dedup concern.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::traits::{ForegroundGate, Prober};

/// Default pause between probes (milliseconds).
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 750;

/// Default latency threshold separating muted from unmuted playback
/// (milliseconds).
pub const DEFAULT_MUTE_THRESHOLD_MS: u64 = 100;

/// Timing knobs for the probe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Pause between consecutive probes.
    pub interval: Duration,
    /// Strict latency threshold: `elapsed < threshold` means muted.
    pub threshold: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
            threshold: Duration::from_millis(DEFAULT_MUTE_THRESHOLD_MS),
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Verdict callback; receives `true` when the probe classified the
/// output as muted.
pub type VerdictCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Periodic mute prober.
///
/// `start` spawns an independent probing task and hands back the handle
/// controlling it. One instance can be started again after a previous
/// run was stopped; concurrent runs are the caller's responsibility to
/// avoid.
pub struct MuteProbe {
    prober: Arc<dyn Prober>,
    gate: Arc<dyn ForegroundGate>,
    config: ProbeConfig,
}

impl MuteProbe {
    pub fn new(prober: Arc<dyn Prober>, gate: Arc<dyn ForegroundGate>, config: ProbeConfig) -> Self {
        Self {
            prober,
            gate,
            config,
        }
    }

    pub fn config(&self) -> ProbeConfig {
        self.config
    }

    /// Spawn the probing task: one immediate probe, then one per tick.
    pub fn start(&self, on_verdict: VerdictCallback) -> ProbeHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_probe_loop(
            Arc::clone(&self.prober),
            Arc::clone(&self.gate),
            self.config,
            on_verdict,
            cancel.clone(),
        ));
        ProbeHandle { cancel, task }
    }
}

/// Handle to a running probe loop.
///
/// After `stop` returns, the loop reports no verdict once it observes
/// the cancellation; a probe already in flight completes without
/// reporting and without leaking its task.
pub struct ProbeHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProbeHandle {
    /// Stop the loop. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True once the probing task has fully wound down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_probe_loop(
    prober: Arc<dyn Prober>,
    gate: Arc<dyn ForegroundGate>,
    config: ProbeConfig,
    on_verdict: VerdictCallback,
    cancel: CancellationToken,
) {
    // tokio panics on a zero interval
    let period = config.interval.max(Duration::from_millis(1));
    let mut ticker = interval(period);
    // Delay re-anchors the deadlines behind an overrun instead of
    // bursting the missed ones.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(
        interval_ms = period.as_millis() as u64,
        threshold_ms = config.threshold.as_millis() as u64,
        "probe loop started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let cycle_started = Instant::now();
        if let Some(muted) = probe_once(prober.as_ref(), gate.as_ref(), config.threshold).await {
            // The probe may have been in flight when stop was called;
            // its verdict must not be reported.
            if cancel.is_cancelled() {
                break;
            }
            on_verdict(muted);
        }
        // Delay still lets one already-expired tick fire immediately
        // after an overrun. Re-anchor so the next probe waits out a
        // full period.
        if cycle_started.elapsed() >= period {
            ticker.reset();
        }
    }

    tracing::debug!("probe loop stopped");
}

/// One probe cycle. Returns `None` when the cycle was skipped.
async fn probe_once(
    prober: &dyn Prober,
    gate: &dyn ForegroundGate,
    threshold: Duration,
) -> Option<bool> {
    if gate.is_backgrounded().await {
        tracing::trace!("probe skipped: host backgrounded");
        return None;
    }

    let started = Instant::now();
    let result = prober.ping().await;
    let elapsed = started.elapsed();

    let muted = match result {
        // Playback that returns faster than the threshold did no real
        // work: the output is muted.
        Ok(()) => elapsed < threshold,
        Err(e) => {
            tracing::debug!("probe failed, assuming unmuted: {e}");
            false
        }
    };
    tracing::trace!(
        elapsed_ms = elapsed.as_millis() as u64,
        muted,
        "probe completed"
    );
    Some(muted)
}

// ─── Tests ───────────────────────────────────────────────────────────
