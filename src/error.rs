use std::fmt::{self, Debug, Display};
use std::time::Duration;

use thiserror::Error;

/// Error type for all ring operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring buffer full, cannot enqueue until a slot is released")]
    Full,
    #[error("Ring buffer empty, nothing published to dequeue")]
    Empty,
    #[error("Timed out after {0:?} waiting on the ring buffer")]
    Timeout(Duration),
}

/// A value the ring refused to take, handed back to the caller along with the reason.
#[derive(Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    pub value: T,
    pub reason: RingError,
}

impl<T> Rejected<T> {
    pub(crate) fn full(value: T) -> Self {
        Self {
            value,
            reason: RingError::Full,
        }
    }

    /// Recovers the value that was not enqueued.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn reason(&self) -> RingError {
        self.reason
    }
}

impl<T> Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl<T> std::error::Error for Rejected<T> {}

impl<T> From<Rejected<T>> for RingError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.reason
    }
}
