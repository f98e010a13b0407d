use std::sync::Mutex;

use tracing::trace;

/// Percentage reached once every part is transferred.
pub const PROGRESS_AFTER_PARTS: u8 = 90;

/// Percentage reached once the thumbnail is uploaded and confirmed.
pub const PROGRESS_AFTER_THUMBNAIL: u8 = 95;

/// Percentage reached once the transfer is committed.
pub const PROGRESS_DONE: u8 = 100;

/// Callback invoked with each new percentage.
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// Maps `completed` of `total` parts into the 0..=90 band.
pub fn part_progress(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return PROGRESS_AFTER_PARTS;
    }
    let ratio = f64::from(completed.min(total)) / f64::from(total);
    (ratio * f64::from(PROGRESS_AFTER_PARTS)).round() as u8
}

/// Publishes a single upload percentage to registered callbacks.
///
/// Within one attempt the published value never decreases: stale reports
/// from slower part tasks are dropped. [`reset`](Self::reset) starts a new
/// attempt at 0 and returns its epoch; [`report_in`](Self::report_in)
/// ignores reports tagged with an older epoch. Callbacks run while the
/// reporter is locked and must not call back into it.
pub struct ProgressReporter {
    inner: Mutex<ReporterInner>,
}

struct ReporterInner {
    current: u8,
    epoch: u64,
    callbacks: Vec<ProgressCallback>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ReporterInner {
                current: 0,
                epoch: 0,
                callbacks: Vec::new(),
            }),
        }
    }

    /// Registers a progress callback.
    pub fn on_progress(&self, callback: ProgressCallback) {
        let mut inner = self.lock();
        inner.callbacks.push(callback);
    }

    /// Current percentage.
    pub fn current(&self) -> u8 {
        self.lock().current
    }

    /// Epoch of the current attempt.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Sets the percentage back to 0 for a new attempt and returns the
    /// attempt's epoch.
    pub fn reset(&self) -> u64 {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.current = 0;
        notify(&inner, 0);
        inner.epoch
    }

    /// Raises the percentage to `percent` (capped at 100).
    ///
    /// Returns `false` when the report was stale and nothing was published.
    pub fn report(&self, percent: u8) -> bool {
        let mut inner = self.lock();
        raise(&mut inner, percent)
    }

    /// Like [`report`](Self::report), but only while `epoch` is current.
    pub fn report_in(&self, epoch: u64, percent: u8) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            trace!(epoch, current = inner.epoch, percent, "stale progress dropped");
            return false;
        }
        raise(&mut inner, percent)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterInner> {
        // Poisoned by a panicking callback; the state itself is still valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn raise(inner: &mut ReporterInner, percent: u8) -> bool {
    let percent = percent.min(PROGRESS_DONE);
    if percent <= inner.current {
        return false;
    }
    inner.current = percent;
    notify(inner, percent);
    true
}

fn notify(inner: &ReporterInner, percent: u8) {
    trace!(percent, "progress");
    for cb in &inner.callbacks {
        cb(percent);
    }
}
