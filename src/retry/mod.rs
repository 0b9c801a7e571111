//! Retry and repeat with composable policies.
//!
//! The pieces are kept apart so each can be tested on its own:
//!
//! - [`RetryStatus`]: where a loop stands (attempt counter, delays so far)
//! - [`RetryPolicy`]: a pure function from status to the next delay, or
//!   `None` to give up
//! - the loops themselves: [`Effect::retry`](crate::Effect::retry),
//!   [`Effect::repeat`](crate::Effect::repeat) and their status-aware
//!   variants
//!
//! # Quick Start
//!
//! ```rust
//! use tributary::{Effect, Fault, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential_backoff(Duration::from_millis(1))
//!     .append(RetryPolicy::limit_retries(3));
//!
//! let effect = Effect::<i32, Fault>::fail(Fault::Aborted)
//!     .retry(|fault| !fault.is_panic(), policy);
//!
//! assert_eq!(effect.run().await, Err(Fault::Aborted));
//! # });
//! ```
//!
//! # Standard shapes
//!
//! | Policy | Delay for attempt `n` |
//! |--------|-----------------------|
//! | [`RetryPolicy::limit_retries`] | zero while `n < limit` |
//! | [`RetryPolicy::constant_delay`] | `d` |
//! | [`RetryPolicy::incremental_delay`] | `base * (n + 1)` |
//! | [`RetryPolicy::exponential_backoff`] | `base * 2^n` |
//! | [`RetryPolicy::fibonacci_backoff`] | `base * fib(n + 1)` |
//! | [`RetryPolicy::jittered`] | randomized, see [`Jitter`] |
//!
//! Shapes without a limit retry forever; bound them with
//! [`append`](RetryPolicy::append) or one of the `limit_retries_by_*`
//! combinators.

mod engine;
mod policy;
mod status;

pub use policy::{Jitter, RetryPolicy};
pub use status::RetryStatus;
