//! Pure core of the composite audio-status pipeline.
//!
//! Value types, the tagged update event, and the merge/dedup state
//! machine. Nothing in this crate is async or does IO, so the dedup and
//! termination semantics are testable in isolation.

pub mod error;
pub mod merge;
pub mod types;

pub use error::SourceError;
pub use merge::{MergeOutcome, MergeState};
pub use types::{AudioStatus, LevelSample, StatusEvent, clamp_level};
