//! Progress reporting seam for long sweeps.
//!
//! The metric engine notifies an optional observer roughly every
//! [`PROGRESS_INTERVAL`] SCCs per sweep stage. Reporting is informational
//! only; the engine never assumes an observer is present and correctness
//! does not depend on the callbacks.

/// How many SCCs between progress callbacks.
pub const PROGRESS_INTERVAL: usize = 1_000;

/// Receiver for periodic progress updates.
///
/// Implementations must be cheap: the engine calls from its hot sweep loop.
pub trait ProgressObserver: Send + Sync {
    /// `processed` out of `total` units are done for `stage`.
    fn on_progress(&self, stage: &str, processed: usize, total: usize);
}

/// Notify `observer` if `processed` crossed a reporting boundary.
pub(crate) fn report(
    observer: Option<&dyn ProgressObserver>,
    stage: &str,
    processed: usize,
    total: usize,
) {
    if let Some(observer) = observer {
        if processed == total || processed % PROGRESS_INTERVAL == 0 {
            observer.on_progress(stage, processed, total);
        }
    }
}
