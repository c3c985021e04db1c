//! `quietwatch watch` — stream merged quietness status changes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quietwatch_broadcast::StatusBroadcaster;
use quietwatch_core::AudioStatus;
use quietwatch_probe::{AlwaysForeground, MuteProbe, ProbeConfig};

use crate::cli::WatchOpts;
use crate::sim::{SimLevelSource, SimProber};

/// One line of `--json` output.
#[derive(Serialize)]
struct WatchLine {
    ts: DateTime<Utc>,
    level: f64,
    muted: bool,
    has_signal: bool,
    quiet: bool,
}

impl WatchLine {
    fn new(status: AudioStatus) -> Self {
        Self {
            ts: Utc::now(),
            level: status.level,
            muted: status.muted,
            has_signal: status.has_signal(),
            quiet: status.is_quiet(),
        }
    }
}

/// Entry point for `quietwatch watch`.
pub async fn cmd_watch(opts: WatchOpts) -> anyhow::Result<()> {
    let config = ProbeConfig::default()
        .with_interval(Duration::from_millis(opts.probe_interval_ms))
        .with_threshold(Duration::from_millis(opts.mute_threshold_ms));
    let source = Arc::new(SimLevelSource::new(
        Duration::from_millis(opts.wave_period_ms),
        Duration::from_millis(opts.sample_every_ms),
        opts.fail_after,
    ));
    let prober = Arc::new(SimProber::for_threshold(config.threshold, opts.mute_phase_pings));
    let probe = MuteProbe::new(prober, Arc::new(AlwaysForeground), config);

    tracing::info!(
        probe_interval_ms = probe.config().interval.as_millis() as u64,
        mute_threshold_ms = probe.config().threshold.as_millis() as u64,
        "watch started"
    );

    let caster = StatusBroadcaster::new(source, probe);
    let mut stream = caster.stream();

    let deadline = opts
        .duration_secs
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

    loop {
        let stop_at = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = stop_at => break,
            update = stream.recv() => match update {
                Some(Ok(status)) => emit(&status, opts.json)?,
                Some(Err(err)) => anyhow::bail!("level source failed: {err}"),
                None => break,
            },
        }
    }

    tracing::info!("watch stopped");
    Ok(())
}

fn emit(status: &AudioStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&WatchLine::new(*status))?);
    } else {
        println!("{status}");
    }
    Ok(())
}
