//! Progress reporting trait for fix passes.
//!
//! Decouples the batch job from any rendering backend. The CLI provides
//! an `indicatif` implementation; [`NullProgress`] is for tests and
//! log-only runs.

use std::sync::Arc;

/// Trait for reporting progress from a fix pass.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected number of references to process.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` processed references.
    fn inc(&self, delta: u64);

    /// Mark the pass as complete with a final message.
    fn finish(&self, msg: String);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
