//! Progress reporting for long geocoding runs.
//!
//! The geocoding loop reports one unit per batch position through
//! [`ProgressCallback`], so the CLI can render an `indicatif` bar while
//! tests and library callers pass [`NullProgress`] or inspect a
//! [`CountingProgress`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress updates from a batch run.
///
/// Implementations are shared by reference with the geocoding loop, so
/// they must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of positions the run will visit.
    fn set_total(&self, total: u64);

    /// Advances by `delta` positions.
    fn inc(&self, delta: u64);

    /// Updates the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the run as finished with a final message.
    fn finish(&self, msg: String);

    /// Marks the run as finished and removes the indicator.
    fn finish_and_clear(&self);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Keeps the latest total and a monotonically increasing position count.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    position: AtomicU64,
}

impl CountingProgress {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl ProgressCallback for CountingProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        self.position.fetch_add(delta, Ordering::Relaxed);
    }

    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_progress_resets_on_new_total() {
        let progress = CountingProgress::default();
        progress.set_total(3);
        progress.inc(1);
        progress.inc(1);
        assert_eq!(progress.total(), 3);
        assert_eq!(progress.position(), 2);

        progress.set_total(5);
        assert_eq!(progress.position(), 0);
    }
}
