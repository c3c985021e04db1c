//! Collaborator seams for the probe loop. Both traits are object-safe
//! so callers can inject fakes for testing.

use async_trait::async_trait;

use crate::error::ProbeError;

/// Performs one side-effecting probe whose latency is the signal.
///
/// The return value carries no information; what matters is how long
/// the call took. Real implementations play an inaudible sound through
/// the output route being watched.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Reports whether the host process is currently backgrounded.
///
/// Probing while backgrounded would measure a suspended audio pipeline,
/// not the mute switch, so the loop skips those cycles entirely.
#[async_trait]
pub trait ForegroundGate: Send + Sync {
    async fn is_backgrounded(&self) -> bool;
}

/// Gate for hosts with no background notion; never skips a probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysForeground;

#[async_trait]
impl ForegroundGate for AlwaysForeground {
    async fn is_backgrounded(&self) -> bool {
        false
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_foreground_never_backgrounded() {
        assert!(!AlwaysForeground.is_backgrounded().await);
    }
}
