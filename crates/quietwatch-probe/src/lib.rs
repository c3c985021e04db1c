//! Periodic mute probing.
//!
//! Times a side-effecting ping and reads the completion latency as a
//! mute heuristic: playback that returns almost instantly did no real
//! work, so the output is considered muted.

pub mod error;
pub mod probe_loop;
pub mod traits;

pub use error::ProbeError;
pub use probe_loop::{
    DEFAULT_MUTE_THRESHOLD_MS, DEFAULT_PROBE_INTERVAL_MS, MuteProbe, ProbeConfig, ProbeHandle,
    VerdictCallback,
};
pub use traits::{AlwaysForeground, ForegroundGate, Prober};
