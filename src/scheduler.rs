//! Execution contexts for leaf effects.
//!
//! Every leaf constructor that runs caller code takes a [`Scheduler`], so where
//! a computation runs is always visible at the call site. Parallel expressions
//! only start their children together; whether those children actually
//! overlap depends on the schedulers the leaves were built with.
//!
//! | Scheduler | Where the computation runs |
//! |-----------|----------------------------|
//! | [`Scheduler::Inline`] | on the task that awaits the effect |
//! | [`Scheduler::Spawn`] | as a new task on the given runtime |
//! | [`Scheduler::Blocking`] | on the runtime's blocking pool (sync code) |
//!
//! # Example
//!
//! ```rust
//! use tributary::{Effect, Fault, Scheduler};
//!
//! # tokio_test::block_on(async {
//! let inline = Effect::<_, Fault>::from_fn(&Scheduler::Inline, || Ok(21 * 2));
//! assert_eq!(inline.run().await, Ok(42));
//! # });
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::runtime::Handle;

use crate::effect::BoxFuture;
use crate::fault::Fault;

/// Where a leaf computation is executed.
#[derive(Debug, Clone, Default)]
pub enum Scheduler {
    /// Run on the invoking task. No overlap with sibling effects that are
    /// also inline, even inside a parallel expression.
    #[default]
    Inline,
    /// Spawn onto a runtime as an independent task.
    Spawn(Handle),
    /// Run synchronous code on the runtime's blocking thread pool.
    /// Asynchronous leaves given this scheduler are spawned like [`Scheduler::Spawn`].
    Blocking(Handle),
}

impl Scheduler {
    /// A scheduler spawning onto the runtime this call is made from, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::Scheduler;
    ///
    /// assert!(Scheduler::current().is_none());
    ///
    /// # tokio_test::block_on(async {
    /// assert!(matches!(Scheduler::current(), Some(Scheduler::Spawn(_))));
    /// # });
    /// ```
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Scheduler::Spawn)
    }

    /// Returns true when computations run on the invoking task.
    pub fn is_inline(&self) -> bool {
        matches!(self, Scheduler::Inline)
    }

    /// Drive an asynchronous computation, turning panics and aborted tasks
    /// into failures.
    pub(crate) fn execute<T, E, Fut>(&self, future: Fut) -> BoxFuture<'static, Result<T, E>>
    where
        T: Send + 'static,
        E: From<Fault> + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        match self {
            Scheduler::Inline => Box::pin(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => Err(Fault::from_panic(payload).into()),
                }
            }),
            Scheduler::Spawn(handle) | Scheduler::Blocking(handle) => {
                let task = handle.spawn(future);
                Box::pin(async move {
                    match task.await {
                        Ok(result) => result,
                        Err(error) => Err(Fault::from_join(error).into()),
                    }
                })
            }
        }
    }

    /// Drive a synchronous computation, turning panics and aborted tasks
    /// into failures.
    pub(crate) fn execute_blocking<T, E, F>(&self, f: F) -> BoxFuture<'static, Result<T, E>>
    where
        T: Send + 'static,
        E: From<Fault> + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        match self {
            Scheduler::Inline => Box::pin(async move {
                match std::panic::catch_unwind(AssertUnwindSafe(f)) {
                    Ok(result) => result,
                    Err(payload) => Err(Fault::from_panic(payload).into()),
                }
            }),
            Scheduler::Spawn(_) => self.execute(async move { f() }),
            Scheduler::Blocking(handle) => {
                let task = handle.spawn_blocking(f);
                Box::pin(async move {
                    match task.await {
                        Ok(result) => result,
                        Err(error) => Err(Fault::from_join(error).into()),
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn explode(message: &'static str) -> Result<(), Fault> {
        panic!("{}", message)
    }

    #[tokio::test]
    async fn test_inline_captures_panic() {
        let outcome = Scheduler::Inline.execute(explode("inline boom")).await;
        assert!(matches!(outcome, Err(Fault::Panicked { message }) if message == "inline boom"));
    }

    #[tokio::test]
    async fn test_spawn_captures_panic() {
        let scheduler = Scheduler::Spawn(Handle::current());
        let outcome = scheduler.execute(explode("spawned boom")).await;
        assert!(matches!(outcome, Err(Fault::Panicked { message }) if message == "spawned boom"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_runs_sync_code() {
        let scheduler = Scheduler::Blocking(Handle::current());
        let outcome: Result<u64, Fault> = scheduler.execute_blocking(|| Ok(6 * 7)).await;
        assert_eq!(outcome, Ok(42));
    }

    #[tokio::test]
    async fn test_inline_blocking_captures_panic() {
        let outcome: Result<u8, Fault> = Scheduler::Inline
            .execute_blocking(|| panic!("sync boom"))
            .await;
        assert!(matches!(outcome, Err(Fault::Panicked { .. })));
    }

    #[test]
    fn test_default_is_inline() {
        assert!(Scheduler::default().is_inline());
    }
}
