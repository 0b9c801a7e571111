//! Testing utilities for code built on effects.
//!
//! Evaluation strategy is mostly observable through *which* children ran and
//! in *what order*. This module provides small probes for exactly that, a
//! ready-made error type, and assertion macros for outcomes.
//!
//! # Examples
//!
//! ## Probes
//!
//! ```rust
//! use tributary::testing::{Probe, TestError};
//! use tributary::{AllOf, Expression};
//!
//! # tokio_test::block_on(async {
//! let probe = Probe::new();
//! let checks = AllOf::<TestError>::seq([probe.pure(false), probe.pure(true)]);
//!
//! assert_eq!(checks.run().await, Ok(false));
//! assert_eq!(probe.count(), 1);
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use tributary::{assert_fails, assert_succeeds, Effect, Fault};
//!
//! # tokio_test::block_on(async {
//! let value = assert_succeeds!(Effect::<_, Fault>::pure(3).run().await);
//! assert_eq!(value, 3);
//!
//! let fault = assert_fails!(Effect::<u8, _>::fail(Fault::Aborted).run().await);
//! assert_eq!(fault, Fault::Aborted);
//! # });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::effect::Effect;
use crate::fault::Fault;
use crate::scheduler::Scheduler;

/// A general-purpose error for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// A failure raised by the test itself.
    Failed(String),
    /// A failure synthesized by the runtime.
    Fault(Fault),
}

impl TestError {
    /// Shorthand for [`TestError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        TestError::Failed(reason.into())
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Failed(reason) => write!(f, "{}", reason),
            TestError::Fault(fault) => write!(f, "{}", fault),
        }
    }
}

impl std::error::Error for TestError {}

impl From<Fault> for TestError {
    fn from(fault: Fault) -> Self {
        TestError::Fault(fault)
    }
}

/// A shared counter of how many effects were started.
///
/// Clones share the same count, so a probe can be moved into several
/// branches and read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    hits: Arc<AtomicUsize>,
}

impl Probe {
    /// A probe at zero.
    pub fn new() -> Self {
        Probe::default()
    }

    /// Number of hits so far.
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Record one hit.
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// `effect`, counted each time it is started.
    pub fn wrap<T, E>(&self, effect: Effect<T, E>) -> Effect<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let probe = self.clone();
        Effect::unit().and_then(move |_| {
            probe.hit();
            effect.clone()
        })
    }

    /// A counted effect succeeding with `value`.
    pub fn pure<T, E>(&self, value: T) -> Effect<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        self.wrap(Effect::pure(value))
    }

    /// A counted effect failing with `error`.
    pub fn fail<T, E>(&self, error: E) -> Effect<T, E>
    where
        T: Send + 'static,
        E: Clone + Send + Sync + 'static,
    {
        self.wrap(Effect::fail(error))
    }
}

/// Records the order in which effects were started.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trail {
    /// An empty trail.
    pub fn new() -> Self {
        Trail::default()
    }

    /// An effect that appends `label` when started, then succeeds with `value`.
    pub fn step<T, E>(&self, label: impl Into<String>, value: T) -> Effect<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let label = label.into();
        Effect::unit().and_then(move |_| {
            if let Ok(mut entries) = entries.lock() {
                entries.push(label.clone());
            }
            Effect::pure(value.clone())
        })
    }

    /// Labels recorded so far, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

/// An effect succeeding with `value` after `millis` milliseconds.
pub fn delayed<T, E>(millis: u64, value: T) -> Effect<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    Effect::delay(Duration::from_millis(millis)).map(move |_| value.clone())
}

/// An effect failing with `error` on its first `failures` runs, then
/// succeeding with the zero-based index of the run.
///
/// Every clone shares the run count.
pub fn flaky<E>(failures: u32, error: E) -> Effect<u32, E>
where
    E: Clone + From<Fault> + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicU32::new(0));
    Effect::from_fn(&Scheduler::Inline, move || {
        let run = runs.fetch_add(1, Ordering::SeqCst);
        if run < failures {
            Err(error.clone())
        } else {
            Ok(run)
        }
    })
}

/// Assert that an outcome is `Ok`, evaluating to the value.
///
/// # Example
///
/// ```rust
/// use tributary::{assert_succeeds, Fault};
///
/// let outcome: Result<u8, Fault> = Ok(4);
/// assert_eq!(assert_succeeds!(outcome), 4);
/// ```
#[macro_export]
macro_rules! assert_succeeds {
    ($outcome:expr) => {
        match $outcome {
            Ok(value) => value,
            Err(error) => panic!("Expected success, got failure: {:?}", error),
        }
    };
}

/// Assert that an outcome is `Err`, evaluating to the error.
///
/// # Example
///
/// ```rust
/// use tributary::{assert_fails, Fault};
///
/// let outcome: Result<u8, Fault> = Err(Fault::Aborted);
/// assert_eq!(assert_fails!(outcome), Fault::Aborted);
/// ```
#[macro_export]
macro_rules! assert_fails {
    ($outcome:expr) => {
        match $outcome {
            Err(error) => error,
            Ok(value) => panic!("Expected failure, got success: {:?}", value),
        }
    };
}

#[cfg(feature = "proptest")]
mod arbitrary {
    use proptest::prelude::*;

    use crate::expression::Strategy as Evaluation;
    use crate::retry::RetryStatus;

    impl Arbitrary for RetryStatus {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (0u32..64, 0u64..3_600_000, 0u64..60_000)
                .prop_map(|(counter, cumulative, previous)| {
                    RetryStatus::new(
                        counter,
                        std::time::Duration::from_millis(cumulative),
                        std::time::Duration::from_millis(previous),
                    )
                })
                .boxed()
        }
    }

    impl Arbitrary for Evaluation {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![Just(Evaluation::Parallel), Just(Evaluation::Sequential)].boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_counts_starts_across_clones() {
        let probe = Probe::new();
        let effect = probe.clone().pure::<_, TestError>(1);

        effect.run().await.unwrap();
        effect.run().await.unwrap();
        assert_eq!(probe.count(), 2);
    }

    #[tokio::test]
    async fn trail_records_start_order() {
        let trail = Trail::new();
        let second = trail.step::<_, TestError>("second", 2);
        let first = trail.step::<_, TestError>("first", 1);

        first.run().await.unwrap();
        second.run().await.unwrap();
        assert_eq!(trail.entries(), ["first", "second"]);
    }

    #[tokio::test]
    async fn flaky_fails_then_succeeds() {
        let effect = flaky(2, TestError::failed("not yet"));

        assert_eq!(effect.run().await, Err(TestError::failed("not yet")));
        assert_eq!(effect.run().await, Err(TestError::failed("not yet")));
        assert_eq!(effect.run().await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_waits_before_value() {
        let start = tokio::time::Instant::now();
        assert_eq!(delayed::<_, TestError>(30, "late").run().await, Ok("late"));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TestError::failed("nope").to_string(), "nope");
        assert_eq!(TestError::from(Fault::Aborted), TestError::Fault(Fault::Aborted));
    }

    #[test]
    #[should_panic(expected = "Expected success, got failure")]
    fn assert_succeeds_panics_on_failure() {
        let outcome: Result<u8, TestError> = Err(TestError::failed("x"));
        assert_succeeds!(outcome);
    }

    #[test]
    #[should_panic(expected = "Expected failure, got success")]
    fn assert_fails_panics_on_success() {
        let outcome: Result<u8, TestError> = Ok(1);
        assert_fails!(outcome);
    }

    #[cfg(feature = "proptest")]
    mod proptest_tests {
        use crate::expression::Strategy;
        use crate::retry::RetryStatus;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_status_advances_counter(status in any::<RetryStatus>()) {
                let next = status.advance(std::time::Duration::from_millis(1));
                prop_assert_eq!(next.counter(), status.counter() + 1);
            }

            #[test]
            fn arbitrary_strategy_round_trips_serde(strategy in any::<Strategy>()) {
                let encoded = serde_json::to_string(&strategy).unwrap();
                prop_assert_eq!(serde_json::from_str::<Strategy>(&encoded).unwrap(), strategy);
            }
        }
    }
}
