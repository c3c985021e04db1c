//! Simulated capture stack for interactive runs.
//!
//! The level source emits a quantized triangle wave so the feed shows
//! both movement and plateaus; the prober alternates between fast and
//! slow ping phases so mute transitions appear without a real output
//! device.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

use quietwatch_broadcast::{LevelCallback, LevelSource};
use quietwatch_core::{LevelSample, SourceError};
use quietwatch_probe::{ProbeError, Prober};

/// Triangle wave position for a phase in `[0, 1)`.
fn triangle(phase: f64) -> f64 {
    if phase < 0.5 { 2.0 * phase } else { 2.0 - 2.0 * phase }
}

/// Snap to twentieths so consecutive samples repeat and exercise the
/// downstream dedup.
fn quantize(level: f64) -> f64 {
    (level * 20.0).round() / 20.0
}

/// Whether ping `index` falls in a muted phase of the alternation.
fn muted_phase(index: u32, cycle: u32) -> bool {
    (index / cycle) % 2 == 1
}

/// Level source producing a repeating wave on its own task.
pub struct SimLevelSource {
    wave_period: Duration,
    sample_every: Duration,
    fail_after: Option<usize>,
}

impl SimLevelSource {
    pub fn new(wave_period: Duration, sample_every: Duration, fail_after: Option<usize>) -> Self {
        Self {
            wave_period: wave_period.max(Duration::from_millis(1)),
            sample_every: sample_every.max(Duration::from_millis(1)),
            fail_after,
        }
    }
}

impl LevelSource for SimLevelSource {
    fn subscribe(&self, callback: LevelCallback) -> CancellationToken {
        let token = CancellationToken::new();
        let stop = token.clone();
        let wave_period = self.wave_period;
        let sample_every = self.sample_every;
        let fail_after = self.fail_after;

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(sample_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut emitted = 0usize;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if fail_after.is_some_and(|n| emitted >= n) {
                    callback(Err(SourceError::new("simulated capture failure")));
                    break;
                }
                let phase =
                    (started.elapsed().as_secs_f64() / wave_period.as_secs_f64()).fract();
                callback(Ok(LevelSample::now(quantize(triangle(phase)))));
                emitted += 1;
            }
        });

        token
    }
}

/// Prober with alternating fast and slow ping phases.
pub struct SimProber {
    fast: Duration,
    slow: Duration,
    cycle: u32,
    pings: AtomicU32,
}

impl SimProber {
    /// Latencies derived from the verdict threshold: fast pings land
    /// well under it, slow pings well over.
    pub fn for_threshold(threshold: Duration, cycle: u32) -> Self {
        Self {
            fast: threshold / 4,
            slow: threshold * 3,
            cycle: cycle.max(1),
            pings: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Prober for SimProber {
    async fn ping(&self) -> Result<(), ProbeError> {
        let index = self.pings.fetch_add(1, Ordering::Relaxed);
        let delay = if muted_phase(index, self.cycle) {
            self.fast
        } else {
            self.slow
        };
        sleep(delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_rises_then_falls() {
        assert_eq!(triangle(0.0), 0.0);
        assert_eq!(triangle(0.25), 0.5);
        assert_eq!(triangle(0.5), 1.0);
        assert_eq!(triangle(0.75), 0.5);
    }

    #[test]
    fn quantize_snaps_to_twentieths() {
        assert_eq!(quantize(0.512), 0.5);
        assert_eq!(quantize(0.537), 0.55);
        assert_eq!(quantize(1.0), 1.0);
    }

    #[test]
    fn probe_phases_alternate_per_cycle() {
        assert!(!muted_phase(0, 4));
        assert!(!muted_phase(3, 4));
        assert!(muted_phase(4, 4));
        assert!(muted_phase(7, 4));
        assert!(!muted_phase(8, 4));
    }
}
