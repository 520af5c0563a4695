//! Per-emission hooks.

use super::{Event, Level};

/// Called for every event an engine emits, right before it is encoded.
///
/// Hooks may add fields to the event. They are not called for events
/// filtered out by the level threshold.
pub trait Hook: Send + Sync {
    fn run(&self, event: &mut Event, level: Level, message: &str);
}

impl<F> Hook for F
where
    F: Fn(&mut Event, Level, &str) + Send + Sync,
{
    fn run(&self, event: &mut Event, level: Level, message: &str) {
        self(event, level, message)
    }
}
