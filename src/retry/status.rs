//! Progress of a retry or repeat loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a retry/repeat loop stands.
///
/// A fresh status is created per evaluation. The loop never mutates it: each
/// granted delay produces the next status via [`RetryStatus::advance`].
///
/// # Example
///
/// ```rust
/// use tributary::RetryStatus;
/// use std::time::Duration;
///
/// let first = RetryStatus::initial();
/// let second = first.advance(Duration::from_millis(100));
///
/// assert_eq!(second.counter(), 1);
/// assert_eq!(second.cumulative_delay(), Duration::from_millis(100));
/// assert_eq!(second.previous_delay(), Duration::from_millis(100));
/// assert_eq!(first.counter(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RetryStatus {
    counter: u32,
    cumulative_delay: Duration,
    previous_delay: Duration,
}

impl RetryStatus {
    /// The status of the first attempt: counter 0 and no delay so far.
    pub const fn initial() -> Self {
        RetryStatus {
            counter: 0,
            cumulative_delay: Duration::ZERO,
            previous_delay: Duration::ZERO,
        }
    }

    /// A status with explicit fields, for exercising policies directly.
    pub const fn new(counter: u32, cumulative_delay: Duration, previous_delay: Duration) -> Self {
        RetryStatus {
            counter,
            cumulative_delay,
            previous_delay,
        }
    }

    /// Retries performed so far; 0 on the first attempt.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Total backoff waited so far.
    pub fn cumulative_delay(&self) -> Duration {
        self.cumulative_delay
    }

    /// The delay granted before the current attempt, zero initially.
    pub fn previous_delay(&self) -> Duration {
        self.previous_delay
    }

    /// The status after waiting `delay`.
    #[must_use]
    pub fn advance(&self, delay: Duration) -> Self {
        RetryStatus {
            counter: self.counter.saturating_add(1),
            cumulative_delay: self.cumulative_delay.saturating_add(delay),
            previous_delay: delay,
        }
    }
}
