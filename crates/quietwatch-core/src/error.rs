//! Error type delivered through the composite stream.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure reported by a level source.
///
/// `Clone` because one failure fans out to every registered subscriber
/// and is cached afterward for late joiners. Probe failures never
/// become a `SourceError`; they are absorbed by the probe loop.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("level source failed: {message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary source-side error, keeping only its display text.
    pub fn wrap(err: &(impl std::fmt::Display + ?Sized)) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
