//! Progress reporting and cooperative cancellation for long passes.
//!
//! A [`Progress`] handle is cheap to clone and can be shared with another
//! thread, which polls [`Progress::fraction`] and may call
//! [`Progress::cancel`]. Operations check the flag at each outer loop step and
//! stop early, leaving whatever they already wrote in place.
//!
//! The cancel flag is sticky: starting an operation never clears it, so every
//! later operation on the same handle also reports
//! [`RunStatus::Cancelled`] until the caller calls [`Progress::clear_cancel`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Outcome of a cancellable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped early; the grid holds a partial result.
    Cancelled,
}

impl RunStatus {
    pub fn is_completed(self) -> bool {
        self == RunStatus::Completed
    }
}

#[derive(Debug, Clone, Default)]
pub struct Progress {
    fraction_bits: Arc<AtomicU32>,
    cancelled: Arc<AtomicBool>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported completion in [0, 1].
    pub fn fraction(&self) -> f32 {
        f32::from_bits(self.fraction_bits.load(Ordering::Relaxed))
    }

    pub fn report(&self, stage: &str, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f32 / total as f32).clamp(0.0, 1.0)
        };
        self.fraction_bits
            .store(fraction.to_bits(), Ordering::Relaxed);
        log::trace!("{stage}: {done}/{total}");
    }

    /// Sets the fraction back to 0 at the start of an operation. The cancel
    /// flag is left alone.
    pub fn reset(&self) {
        self.fraction_bits.store(0f32.to_bits(), Ordering::Relaxed);
    }

    /// Re-arms the handle after a cancellation.
    pub fn clear_cancel(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Convenience for loop heads: logs once and returns the cancelled status.
    pub(crate) fn check(&self, stage: &str) -> Option<RunStatus> {
        if self.is_cancelled() {
            log::warn!("{stage} cancelled, grid left partially updated");
            Some(RunStatus::Cancelled)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_updates_fraction() {
        let progress = Progress::new();
        assert_eq!(progress.fraction(), 0.0);
        progress.report("erosion", 1, 4);
        assert_eq!(progress.fraction(), 0.25);
        progress.report("erosion", 9, 4);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let progress = Progress::new();
        let observer = progress.clone();
        observer.cancel();
        assert!(progress.is_cancelled());
        assert_eq!(progress.check("smooth"), Some(RunStatus::Cancelled));

        // 进度归零不会清除取消标记
        progress.report("smooth", 1, 2);
        progress.reset();
        assert_eq!(progress.fraction(), 0.0);
        assert!(observer.is_cancelled());

        progress.clear_cancel();
        assert!(!observer.is_cancelled());
        assert_eq!(progress.check("smooth"), None);
    }
}
