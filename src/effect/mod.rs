//! The asynchronous effect value and its primitive operators.
//!
//! An [`Effect<T, E>`] is a description of a computation that, each time it is
//! run, completes exactly once with `Ok(T)` or `Err(E)`. Effects are lazy and
//! immutable: nothing happens until [`Effect::run`] is awaited, running the same
//! effect twice runs the underlying computation twice, and every combinator
//! returns a new effect that shares the old one structurally.
//!
//! # Leaves
//!
//! | Constructor | Behaviour |
//! |-------------|-----------|
//! | [`Effect::pure`] / [`Effect::fail`] | constant outcome, no scheduling |
//! | [`Effect::always_true`] / [`Effect::always_false`] / [`Effect::unit`] | predefined constants |
//! | [`Effect::from_fn`] | synchronous closure on a [`Scheduler`] |
//! | [`Effect::from_async`] | asynchronous closure on a [`Scheduler`] |
//! | [`Effect::defer`] | build a fresh effect on every run |
//! | [`Effect::delay`] | resolve after a duration |
//!
//! # Composition
//!
//! ```rust
//! use tributary::{Effect, Fault, Scheduler};
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::<_, Fault>::pure(5)
//!     .map(|x| x * 2)
//!     .and_then(|x| Effect::pure(x + 10));
//!
//! assert_eq!(effect.run().await, Ok(20));
//! // Effects are values: run it again, get the same answer.
//! assert_eq!(effect.run().await, Ok(20));
//! # });
//! ```
//!
//! # Failures are data
//!
//! Errors returned by leaf closures, and panics raised while they run, become
//! failure outcomes that downstream combinators can inspect:
//!
//! ```rust
//! use tributary::{Effect, Fault, Scheduler};
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::<i32, Fault>::from_fn(&Scheduler::Inline, || panic!("bad input"))
//!     .recover(|_| -1);
//!
//! assert_eq!(effect.run().await, Ok(-1));
//! # });
//! ```

pub mod bracket;
pub(crate) mod combinators;
pub mod instrument;
pub(crate) mod rewrite;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, RuntimeFlavor};

use crate::fault::Fault;
use crate::scheduler::Scheduler;
use combinators::{
    AndThen, AndThenOrElse, Defer, Delay, Fail, FailWith, FallbackTo, FromAsync, FromFn, Map,
    MapErr, Pure, Race, Recover, RecoverWith, Tap, TapErr, Timeout, TryMap,
};
use rewrite::Rewrite;

pub use bracket::bracket;

/// A boxed future that is Send
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One node of an effect tree.
///
/// Leaves and combinators only implement `evaluate`. Expressions also implement
/// `rewrite` so that tree-wide transforms reach their children.
pub(crate) trait Node<T, E>: Send + Sync {
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>>;

    fn kind(&self) -> &'static str {
        "Effect"
    }

    /// Rebuild this node with `rewrite` applied to its children.
    /// `None` marks a leaf, which the rewrite wraps as a whole.
    fn rewrite(&self, _rewrite: &Rewrite<E>) -> Option<Effect<T, E>> {
        None
    }
}

/// A lazy, re-runnable asynchronous computation producing `T` or failing with `E`.
///
/// Cloning is cheap: clones share the same immutable tree.
pub struct Effect<T, E> {
    node: Arc<dyn Node<T, E>>,
}

impl<T, E> Clone for Effect<T, E> {
    fn clone(&self) -> Self {
        Effect {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T, E> std::fmt::Debug for Effect<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("kind", &self.node.kind())
            .finish()
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn from_node<N>(node: N) -> Self
    where
        N: Node<T, E> + 'static,
    {
        Effect {
            node: Arc::new(node),
        }
    }

    pub(crate) fn rewrite_with(&self, rewrite: &Rewrite<E>) -> Option<Effect<T, E>> {
        self.node.rewrite(rewrite)
    }

    /// Start the computation. The returned future resolves to its outcome.
    ///
    /// Each call is an independent evaluation; outcomes are never memoized.
    pub fn run(&self) -> BoxFuture<'static, Result<T, E>> {
        self.node.evaluate()
    }

    /// The name of the outermost node, e.g. `"Map"` or `"AllOf.par"`.
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Block the calling thread until the effect completes.
    ///
    /// Meant for tests and diagnostics. Outside a runtime a private
    /// current-thread runtime drives the effect; inside a multi-threaded
    /// runtime the worker is handed over with `block_in_place`. Blocking a
    /// current-thread runtime would deadlock, so that case fails with
    /// [`Fault::Runtime`] instead.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::{Effect, Fault};
    ///
    /// let effect = Effect::<_, Fault>::pure(7).map(|x| x * 6);
    /// assert_eq!(effect.join(), Ok(42));
    /// ```
    pub fn join(&self) -> Result<T, E>
    where
        E: From<Fault>,
    {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.run()))
            }
            Ok(_) => Err(Fault::Runtime(
                "cannot block inside a current-thread runtime".to_string(),
            )
            .into()),
            Err(_) => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| Fault::Runtime(e.to_string()))?;
                runtime.block_on(self.run())
            }
        }
    }

    /// An effect that always succeeds with a clone of `value`.
    pub fn pure(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Effect::from_node(Pure { value })
    }

    /// An effect that always fails with a clone of `error`.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Effect::from_node(Fail { error })
    }

    /// An effect that fails with a freshly built error on every run.
    ///
    /// Useful when `E` is not `Clone`.
    pub fn fail_with<F>(make_error: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Effect::from_node(FailWith {
            make_error: Arc::new(make_error),
        })
    }

    /// An effect replaying a fixed outcome.
    pub fn from_result(result: Result<T, E>) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        match result {
            Ok(value) => Effect::pure(value),
            Err(error) => Effect::fail(error),
        }
    }

    /// A leaf running a synchronous closure on `scheduler`.
    ///
    /// A panic inside `f` becomes a [`Fault::Panicked`] failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::{Effect, Fault, Scheduler};
    ///
    /// # tokio_test::block_on(async {
    /// let parse = Effect::<u16, Fault>::from_fn(&Scheduler::Inline, || {
    ///     "8080".parse::<u16>().map_err(|e| Fault::Encode(e.to_string()))
    /// });
    /// assert_eq!(parse.run().await, Ok(8080));
    /// # });
    /// ```
    pub fn from_fn<F>(scheduler: &Scheduler, f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: From<Fault>,
    {
        Effect::from_node(FromFn {
            scheduler: scheduler.clone(),
            f: Arc::new(f),
        })
    }

    /// A leaf running an asynchronous closure on `scheduler`.
    ///
    /// The closure is called once per run. Panics while building or polling
    /// the future become [`Fault::Panicked`] failures.
    pub fn from_async<F, Fut>(scheduler: &Scheduler, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: From<Fault>,
    {
        Effect::from_node(FromAsync {
            scheduler: scheduler.clone(),
            f: Arc::new(f),
        })
    }

    /// Build a new effect on every run.
    ///
    /// Construction is deferred until the effect is started, and a panic while
    /// building it is captured as a failure.
    pub fn defer<F>(build: F) -> Self
    where
        F: Fn() -> Effect<T, E> + Send + Sync + 'static,
        E: From<Fault>,
    {
        Effect::from_node(Defer {
            build: Arc::new(build),
        })
    }

    /// Transform the success value. Failures pass through unchanged.
    pub fn map<U, F>(&self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Effect::from_node(Map {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Transform the success value with a fallible function.
    pub fn try_map<U, F>(&self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        Effect::from_node(TryMap {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Discard the success value.
    pub fn void(&self) -> Effect<(), E> {
        self.map(|_| ())
    }

    /// Transform the failure. Successes pass through unchanged.
    pub fn map_err<E2, F>(&self, f: F) -> Effect<T, E2>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        Effect::from_node(MapErr {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Chain a dependent effect.
    ///
    /// On success `f` builds the next effect, whose outcome is adopted. On
    /// failure `f` is never called and the failure propagates.
    pub fn and_then<U, F>(&self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> Effect<U, E> + Send + Sync + 'static,
    {
        Effect::from_node(AndThen {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Chain with one continuation per outcome.
    ///
    /// Exactly one of the two functions runs for a given evaluation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::{Effect, Fault};
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<i32, Fault>::fail(Fault::Aborted).and_then_or_else(
    ///     |n| Effect::pure(format!("got {}", n)),
    ///     |fault| Effect::pure(format!("recovered from {}", fault)),
    /// );
    /// assert_eq!(
    ///     effect.run().await,
    ///     Ok("recovered from computation was aborted before completing".to_string())
    /// );
    /// # });
    /// ```
    pub fn and_then_or_else<U, S, F>(&self, on_success: S, on_failure: F) -> Effect<U, E>
    where
        U: Send + 'static,
        S: Fn(T) -> Effect<U, E> + Send + Sync + 'static,
        F: Fn(E) -> Effect<U, E> + Send + Sync + 'static,
    {
        Effect::from_node(AndThenOrElse {
            inner: self.clone(),
            on_success: Arc::new(on_success),
            on_failure: Arc::new(on_failure),
        })
    }

    /// Turn a failure into a success value.
    pub fn recover<F>(&self, f: F) -> Effect<T, E>
    where
        F: Fn(E) -> T + Send + Sync + 'static,
    {
        Effect::from_node(Recover {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Turn a failure into another effect. If that effect fails, its failure
    /// is the one reported.
    pub fn recover_with<F>(&self, f: F) -> Effect<T, E>
    where
        F: Fn(E) -> Effect<T, E> + Send + Sync + 'static,
    {
        Effect::from_node(RecoverWith {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Try `fallback` when this effect fails.
    ///
    /// Best effort: if the fallback fails too, the **original** failure is
    /// reported and the fallback's is discarded.
    pub fn fallback_to(&self, fallback: Effect<T, E>) -> Effect<T, E> {
        Effect::from_node(FallbackTo {
            primary: self.clone(),
            fallback,
        })
    }

    /// Observe the success value.
    ///
    /// A panicking callback is logged and ignored; the outcome is unchanged.
    pub fn tap<F>(&self, f: F) -> Effect<T, E>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Effect::from_node(Tap {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Observe the failure.
    ///
    /// A panicking callback is logged and ignored; the outcome is unchanged.
    pub fn tap_err<F>(&self, f: F) -> Effect<T, E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        Effect::from_node(TapErr {
            inner: self.clone(),
            f: Arc::new(f),
        })
    }

    /// Fail with [`Fault::Timeout`] if no outcome arrives within `after`.
    ///
    /// The underlying computation is not guaranteed to stop: an inline
    /// computation is dropped, a spawned one keeps running to completion.
    /// Only the observer sees the timeout.
    ///
    /// # Panics
    ///
    /// Panics if `after` is zero.
    pub fn timeout(&self, after: Duration) -> Effect<T, E>
    where
        E: From<Fault>,
    {
        assert!(!after.is_zero(), "timeout duration must be positive");
        Effect::from_node(Timeout {
            inner: self.clone(),
            after,
        })
    }

    /// Adopt the outcome of whichever effect finishes first, success or
    /// failure.
    ///
    /// Losers are not cancelled: they are moved onto the current runtime and
    /// keep running to completion in the background.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::{Effect, Fault, Scheduler};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let slow = Effect::<(), Fault>::delay(Duration::from_millis(200)).map(|_| "slow");
    /// let fast = Effect::<(), Fault>::delay(Duration::from_millis(5)).map(|_| "fast");
    ///
    /// assert_eq!(Effect::race(slow, [fast]).run().await, Ok("fast"));
    /// # });
    /// ```
    pub fn race<I>(first: Effect<T, E>, others: I) -> Effect<T, E>
    where
        I: IntoIterator<Item = Effect<T, E>>,
    {
        let mut contenders = vec![first];
        contenders.extend(others);
        Effect::from_node(Race {
            contenders: contenders.into(),
        })
    }

    /// Race this effect against one other.
    pub fn race_with(&self, other: Effect<T, E>) -> Effect<T, E> {
        Effect::race(self.clone(), [other])
    }
}

impl<E> Effect<bool, E>
where
    E: Send + 'static,
{
    /// The constant `true`.
    pub fn always_true() -> Self {
        Effect::from_node(Pure { value: true })
    }

    /// The constant `false`.
    pub fn always_false() -> Self {
        Effect::from_node(Pure { value: false })
    }
}

impl<E> Effect<(), E>
where
    E: Send + 'static,
{
    /// The constant unit value.
    pub fn unit() -> Self {
        Effect::from_node(Pure { value: () })
    }

    /// Resolve after `duration`.
    ///
    /// A zero duration resolves immediately on the invoking task; anything
    /// longer suspends on the runtime timer.
    pub fn delay(duration: Duration) -> Self {
        Effect::from_node(Delay { duration })
    }
}

impl<T, E> From<Result<T, E>> for Effect<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn from(result: Result<T, E>) -> Self {
        Effect::from_result(result)
    }
}

#[cfg(test)]
mod tests;
