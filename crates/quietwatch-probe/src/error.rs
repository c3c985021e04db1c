//! Probe-side error type.

use thiserror::Error;

/// Failure of a single probe attempt.
///
/// Never reaches subscribers: the probe loop swallows it and reports
/// "not muted" for that cycle.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe playback failed: {0}")]
    Playback(String),
    #[error("probe io error: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_display() {
        let err = ProbeError::Playback("no output route".to_string());
        assert_eq!(err.to_string(), "probe playback failed: no output route");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("session interrupted");
        let err = ProbeError::from(io);
        assert!(matches!(err, ProbeError::Io(_)));
        assert_eq!(err.to_string(), "probe io error: session interrupted");
    }
}
