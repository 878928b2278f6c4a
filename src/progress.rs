//! For tracking encoding progress and aborting early

/// A trait that is used to report progress to some consumer.
pub trait ProgressReporter {
    /// Called after each frame has been written.
    ///
    /// This method may return `false` to abort processing.
    fn increase(&mut self) -> bool;

    /// Not used by the library.
    /// Writing is done when `encode()` returns
    fn done(&mut self, _msg: &str) {}
}

/// No-op progress reporter
pub struct NoProgress {}

impl ProgressReporter for NoProgress {
    fn increase(&mut self) -> bool {
        true
    }
}
