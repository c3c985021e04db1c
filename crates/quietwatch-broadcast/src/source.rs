//! Collaborator seam for the passive level feed.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use quietwatch_core::{LevelSample, SourceError};

/// Callback a level source pushes observations into.
pub type LevelCallback = Arc<dyn Fn(Result<LevelSample, SourceError>) + Send + Sync>;

/// Push-based producer of output level samples.
///
/// `subscribe` begins production. Implementations must stop pushing once
/// the returned token is cancelled, and may fail terminally at most once
/// per subscription by pushing an `Err`; anything pushed after a
/// cancelled or failed subscription is discarded downstream.
pub trait LevelSource: Send + Sync {
    fn subscribe(&self, callback: LevelCallback) -> CancellationToken;
}
