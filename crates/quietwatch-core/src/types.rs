//! Composite status value types and the tagged update event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Merged, immutable snapshot of the two signal channels.
///
/// `level` is the passively observed output level; `muted` is the
/// actively probed flag. Two statuses are equal iff both fields are
/// equal, which is exactly the comparison the dedup step relies on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioStatus {
    /// Output level in `[0, 1]`.
    pub level: f64,
    /// Probed mute flag (latency heuristic).
    pub muted: bool,
}

impl AudioStatus {
    /// The zero value: no signal, not muted.
    pub const SILENT: Self = Self {
        level: 0.0,
        muted: false,
    };

    pub fn new(level: f64, muted: bool) -> Self {
        Self {
            level: clamp_level(level),
            muted,
        }
    }

    /// Copy with a new (clamped) level.
    #[must_use]
    pub fn with_level(self, level: f64) -> Self {
        Self {
            level: clamp_level(level),
            muted: self.muted,
        }
    }

    /// Copy with a new probed flag.
    #[must_use]
    pub fn with_muted(self, muted: bool) -> Self {
        Self {
            level: self.level,
            muted,
        }
    }

    /// True when any output level is present.
    pub fn has_signal(&self) -> bool {
        self.level > 0.0
    }

    /// True when the device is effectively silent: no signal, or muted.
    pub fn is_quiet(&self) -> bool {
        !self.has_signal() || self.muted
    }
}

impl Default for AudioStatus {
    fn default() -> Self {
        Self::SILENT
    }
}

impl fmt::Display for AudioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={:.2} muted={} quiet={}",
            self.level,
            self.muted,
            self.is_quiet()
        )
    }
}

/// Clamp a raw level into `[0, 1]`. Non-finite input maps to 0.
pub fn clamp_level(level: f64) -> f64 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One passive observation pushed by a level source.
///
/// Only `level` participates in merging; `observed_at` rides along for
/// logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSample {
    pub level: f64,
    pub observed_at: DateTime<Utc>,
}

impl LevelSample {
    pub fn new(level: f64, observed_at: DateTime<Utc>) -> Self {
        Self { level, observed_at }
    }

    /// Sample stamped with the current wall-clock time.
    pub fn now(level: f64) -> Self {
        Self::new(level, Utc::now())
    }
}

/// Field-level update flowing into the serialized merge handler.
///
/// Both signal channels and the terminal failure funnel through this one
/// type so a single handler can keep the total order.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Passive level observation.
    LevelChanged(f64),
    /// Probe verdict.
    MuteChanged(bool),
    /// The level source failed; the stream is terminal after this.
    SourceFailed(SourceError),
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── 1. Derived fields ───────────────────────────────────────────

    #[test]
    fn has_signal_iff_level_positive() {
        assert!(!AudioStatus::new(0.0, false).has_signal());
        assert!(AudioStatus::new(0.01, false).has_signal());
        assert!(AudioStatus::new(1.0, true).has_signal());
    }

    #[test]
    fn is_quiet_truth_table() {
        // no signal, not muted → quiet
        assert!(AudioStatus::new(0.0, false).is_quiet());
        // no signal, muted → quiet
        assert!(AudioStatus::new(0.0, true).is_quiet());
        // signal, muted → quiet
        assert!(AudioStatus::new(0.5, true).is_quiet());
        // signal, not muted → audible
        assert!(!AudioStatus::new(0.5, false).is_quiet());
    }

    // ── 2. Clamping ─────────────────────────────────────────────────

    #[test]
    fn level_clamped_into_unit_range() {
        assert_eq!(AudioStatus::new(1.5, false).level, 1.0);
        assert_eq!(AudioStatus::new(-0.25, false).level, 0.0);
        assert_eq!(AudioStatus::new(0.4, false).level, 0.4);
    }

    #[test]
    fn non_finite_level_maps_to_zero() {
        assert_eq!(clamp_level(f64::NAN), 0.0);
        assert_eq!(clamp_level(f64::INFINITY), 0.0);
        assert_eq!(clamp_level(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn with_level_clamps_too() {
        let s = AudioStatus::SILENT.with_level(2.0);
        assert_eq!(s.level, 1.0);
    }

    // ── 3. Structural equality ──────────────────────────────────────

    #[test]
    fn equality_covers_both_fields() {
        assert_eq!(AudioStatus::new(0.5, true), AudioStatus::new(0.5, true));
        assert_ne!(AudioStatus::new(0.5, true), AudioStatus::new(0.5, false));
        assert_ne!(AudioStatus::new(0.5, true), AudioStatus::new(0.6, true));
    }

    #[test]
    fn with_muted_preserves_level() {
        let s = AudioStatus::new(0.7, false).with_muted(true);
        assert_eq!(s, AudioStatus::new(0.7, true));
    }

    // ── 4. Serde ────────────────────────────────────────────────────

    #[test]
    fn status_serde_roundtrip() {
        let s = AudioStatus::new(0.35, true);
        let json = serde_json::to_string(&s).expect("serialize");
        let back: AudioStatus = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(s, back);
    }

    #[test]
    fn sample_serde_roundtrip() {
        let sample = LevelSample::new(0.8, "2026-03-01T09:30:00Z".parse().expect("ts"));
        let json = serde_json::to_string(&sample).expect("serialize");
        let back: LevelSample = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(sample, back);
    }

    // ── 5. Display ──────────────────────────────────────────────────

    #[test]
    fn display_is_compact() {
        let s = AudioStatus::new(0.5, false);
        assert_eq!(s.to_string(), "level=0.50 muted=false quiet=false");
    }
}
