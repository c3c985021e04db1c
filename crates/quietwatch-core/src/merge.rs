//! Merge/dedup state machine for the composite channel.
//!
//! Every update (a passive level, a probe verdict, or the terminal
//! failure) is applied here as one atomic step against the last
//! computed status:
//!
//! - **Field merge**: copy the last status (or the silent zero value),
//!   mutate one field, compare against the previous value.
//! - **Dedup**: an unchanged result is stored for future comparisons but
//!   classified as suppressed, so callers deliver only on change.
//! - **Termination**: a source failure latches; everything applied after
//!   it is discarded.
//!
//! The caller owns serialization; this type assumes events arrive one at
//! a time.

use crate::error::SourceError;
use crate::types::{AudioStatus, StatusEvent};

/// Merge-side state of one composite channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeState {
    /// Last computed status, delivered or not.
    last: Option<AudioStatus>,
    /// Latched terminal error, if the source has failed.
    terminal: Option<SourceError>,
}

/// Classification of one applied event.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The composite value changed; deliver it to every subscriber.
    Changed(AudioStatus),
    /// Recomputed value equals the previous one; stored, not delivered.
    Unchanged(AudioStatus),
    /// The source failed; deliver the error once, then nothing more.
    Failed(SourceError),
    /// Event arrived after termination; dropped without effect.
    Discarded,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last computed status, whether or not it was delivered.
    pub fn last(&self) -> Option<AudioStatus> {
        self.last
    }

    /// The latched terminal error, if any.
    pub fn terminal_error(&self) -> Option<&SourceError> {
        self.terminal.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Apply one event and classify the result.
    ///
    /// The first applied field event always classifies as `Changed`:
    /// there is no previous value, so even a recomputed status equal to
    /// the zero value counts as new.
    #[must_use]
    pub fn apply(&mut self, event: StatusEvent) -> MergeOutcome {
        if self.terminal.is_some() {
            return MergeOutcome::Discarded;
        }
        match event {
            StatusEvent::LevelChanged(level) => self.apply_field(|s| s.with_level(level)),
            StatusEvent::MuteChanged(muted) => self.apply_field(|s| s.with_muted(muted)),
            StatusEvent::SourceFailed(err) => {
                self.terminal = Some(err.clone());
                MergeOutcome::Failed(err)
            }
        }
    }

    fn apply_field(&mut self, mutate: impl FnOnce(AudioStatus) -> AudioStatus) -> MergeOutcome {
        let base = self.last.unwrap_or_default();
        let next = mutate(base);
        let changed = self.last != Some(next);
        self.last = Some(next);
        if changed {
            MergeOutcome::Changed(next)
        } else {
            MergeOutcome::Unchanged(next)
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
