//! Composite status broadcasting.
//!
//! One [`StatusBroadcaster`] owns one level-source subscription and one
//! mute-probe loop, merges their updates into a deduplicated composite
//! status, and multiplexes change deliveries to any number of
//! subscribers. The feeds run only while at least one subscriber is
//! registered; the first subscriber starts them and the last cancel
//! stops them.

pub mod broadcaster;
pub mod source;
pub mod stream;
pub mod subscription;

pub use broadcaster::{StatusBroadcaster, StatusCallback, StatusUpdate};
pub use source::{LevelCallback, LevelSource};
pub use stream::StatusStream;
pub use subscription::SubscriptionToken;
