//! `quietwatch ping` — standalone mute probes without the broadcaster.

use std::time::{Duration, Instant};

use quietwatch_probe::Prober;

use crate::cli::PingOpts;
use crate::sim::SimProber;

/// Entry point for `quietwatch ping`. Runs a fixed number of probes and
/// prints each measured latency with its verdict.
pub async fn cmd_ping(opts: PingOpts) -> anyhow::Result<()> {
    let threshold = Duration::from_millis(opts.mute_threshold_ms);
    let prober = SimProber::for_threshold(threshold, opts.mute_phase_pings);

    for n in 0..opts.count {
        if n > 0 {
            tokio::time::sleep(Duration::from_millis(opts.probe_interval_ms)).await;
        }
        let started = Instant::now();
        let result = prober.ping().await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                // Same strict comparison the probe loop applies.
                let verdict = if elapsed < threshold { "muted" } else { "unmuted" };
                println!(
                    "probe {}/{}: {}ms {}",
                    n + 1,
                    opts.count,
                    elapsed.as_millis(),
                    verdict
                );
            }
            Err(e) => {
                println!("probe {}/{}: failed ({e}), assuming unmuted", n + 1, opts.count);
            }
        }
    }

    Ok(())
}
