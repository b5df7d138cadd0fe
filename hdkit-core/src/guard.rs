//! Wall-clock deadline guard for registry operations.

use std::future::Future;
use std::time::Duration;

/// Default deadline for `create_account`.
pub const DEFAULT_CREATE_DEADLINE: Duration = Duration::from_secs(30);

/// Marker for an operation that exceeded its deadline.
///
/// The guarded future is abandoned, not rolled back: its side effects up
/// to the deadline are undefined from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded;

/// Wraps an operation with a hard wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeGuard {
    deadline: Duration,
}

impl TimeGuard {
    /// Creates a guard with the given deadline.
    #[must_use]
    pub const fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Runs `op` under the deadline.
    ///
    /// # Errors
    /// Returns [`DeadlineExceeded`] when the deadline elapses before `op`
    /// completes; `op` is dropped at that point.
    pub async fn run<F: Future>(&self, op: F) -> Result<F::Output, DeadlineExceeded> {
        tokio::time::timeout(self.deadline, op)
            .await
            .map_err(|_elapsed| DeadlineExceeded)
    }
}
