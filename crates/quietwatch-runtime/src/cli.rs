//! CLI definition using clap derive.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quietwatch", about = "shared audio quietness watcher", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch the merged quietness status as it changes
    Watch(WatchOpts),
    /// Run standalone mute probes and print each verdict
    Ping(PingOpts),
}

#[derive(Args)]
pub struct WatchOpts {
    /// Pause between mute probes in milliseconds
    #[arg(long, env = "QUIETWATCH_PROBE_INTERVAL_MS", default_value_t = 750)]
    pub probe_interval_ms: u64,

    /// Ping latency below this many milliseconds counts as muted
    #[arg(long, env = "QUIETWATCH_MUTE_THRESHOLD_MS", default_value_t = 100)]
    pub mute_threshold_ms: u64,

    /// Emit line-delimited JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Stop after this many seconds instead of running until Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Period of the simulated level wave in milliseconds
    #[arg(long, default_value_t = 4000)]
    pub wave_period_ms: u64,

    /// Cadence of simulated level samples in milliseconds
    #[arg(long, default_value_t = 250)]
    pub sample_every_ms: u64,

    /// Length of each simulated mute phase, in probes
    #[arg(long, default_value_t = 4)]
    pub mute_phase_pings: u32,

    /// Fail the simulated level source after this many samples
    #[arg(long)]
    pub fail_after: Option<usize>,
}

#[derive(Args)]
pub struct PingOpts {
    /// Number of probes to run
    #[arg(long, default_value_t = 5)]
    pub count: u32,

    /// Pause between probes in milliseconds
    #[arg(long, env = "QUIETWATCH_PROBE_INTERVAL_MS", default_value_t = 750)]
    pub probe_interval_ms: u64,

    /// Ping latency below this many milliseconds counts as muted
    #[arg(long, env = "QUIETWATCH_MUTE_THRESHOLD_MS", default_value_t = 100)]
    pub mute_threshold_ms: u64,

    /// Length of each simulated mute phase, in probes
    #[arg(long, default_value_t = 2)]
    pub mute_phase_pings: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn watch_defaults() {
        let cli = Cli::try_parse_from(["quietwatch", "watch"]).expect("parse");
        let Command::Watch(opts) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(opts.probe_interval_ms, 750);
        assert_eq!(opts.mute_threshold_ms, 100);
        assert!(!opts.json);
        assert_eq!(opts.duration_secs, None);
        assert_eq!(opts.mute_phase_pings, 4);
    }

    #[test]
    fn watch_flags_parse() {
        let cli = Cli::try_parse_from([
            "quietwatch",
            "watch",
            "--json",
            "--duration-secs",
            "5",
            "--fail-after",
            "12",
            "--mute-phase-pings",
            "6",
        ])
        .expect("parse");
        let Command::Watch(opts) = cli.command else {
            panic!("expected watch command");
        };
        assert!(opts.json);
        assert_eq!(opts.duration_secs, Some(5));
        assert_eq!(opts.fail_after, Some(12));
        assert_eq!(opts.mute_phase_pings, 6);
    }

    #[test]
    fn ping_defaults() {
        let cli = Cli::try_parse_from(["quietwatch", "ping"]).expect("parse");
        let Command::Ping(opts) = cli.command else {
            panic!("expected ping command");
        };
        assert_eq!(opts.count, 5);
        assert_eq!(opts.probe_interval_ms, 750);
        assert_eq!(opts.mute_phase_pings, 2);
    }
}
