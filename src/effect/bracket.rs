//! Bracket pattern for safe resource management.
//!
//! [`bracket`] acquires a resource, hands it to a body and releases it
//! whatever the body's outcome. Release also runs when the evaluation is
//! dropped before completing, for instance when an enclosing
//! [`timeout`](crate::Effect::timeout) or race abandons it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use tributary::{bracket, Effect, Fault, Scheduler};
//!
//! # tokio_test::block_on(async {
//! let open = Arc::new(AtomicUsize::new(0));
//!
//! let acquire = {
//!     let open = Arc::clone(&open);
//!     Effect::<_, Fault>::from_fn(&Scheduler::Inline, move || {
//!         open.fetch_add(1, Ordering::SeqCst);
//!         Ok("conn")
//!     })
//! };
//! let release = {
//!     let open = Arc::clone(&open);
//!     move |_conn: &'static str| {
//!         open.fetch_sub(1, Ordering::SeqCst);
//!         Effect::unit()
//!     }
//! };
//!
//! let query = bracket(acquire, |conn| Effect::pure(format!("{conn}: 3 rows")), release);
//!
//! assert_eq!(query.run().await, Ok("conn: 3 rows".to_string()));
//! assert_eq!(open.load(Ordering::SeqCst), 0);
//! # });
//! ```

use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;

/// Acquire a resource, use it, and always release it.
///
/// * `acquire` runs first; if it fails, neither `use_fn` nor `release` runs.
/// * `use_fn` borrows the resource and returns the effect to run with it.
/// * `release` takes ownership of the resource once the body has finished,
///   successfully or not.
///
/// The body's outcome is returned. A panic in `use_fn` releases the
/// resource and fails with [`Fault::Panicked`]. A failing release is logged at `warn`
/// and does not replace it. If the evaluation is dropped while the body is
/// still running, release is spawned onto the current runtime.
///
/// The result is an ordinary effect: every run acquires a fresh resource.
pub fn bracket<R, T, E, U, Rel>(acquire: Effect<R, E>, use_fn: U, release: Rel) -> Effect<T, E>
where
    R: Send + Sync + 'static,
    T: Send + 'static,
    E: From<Fault> + Debug + Send + 'static,
    U: Fn(&R) -> Effect<T, E> + Send + Sync + 'static,
    Rel: Fn(R) -> Effect<(), E> + Send + Sync + 'static,
{
    Effect::from_node(Bracket {
        acquire,
        use_fn: Arc::new(use_fn),
        release: Arc::new(release),
    })
}

struct Bracket<R, E, U, Rel> {
    acquire: Effect<R, E>,
    use_fn: Arc<U>,
    release: Arc<Rel>,
}

impl<R, T, E, U, Rel> Node<T, E> for Bracket<R, E, U, Rel>
where
    R: Send + Sync + 'static,
    T: Send + 'static,
    E: From<Fault> + Debug + Send + 'static,
    U: Fn(&R) -> Effect<T, E> + Send + Sync + 'static,
    Rel: Fn(R) -> Effect<(), E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let acquire = self.acquire.clone();
        let use_fn = Arc::clone(&self.use_fn);
        let release = Arc::clone(&self.release);
        Box::pin(async move {
            let resource = acquire.run().await?;
            let body = match std::panic::catch_unwind(AssertUnwindSafe(|| use_fn(&resource))) {
                Ok(body) => body,
                Err(payload) => {
                    ReleaseGuard::new(resource, release).release().await;
                    return Err(Fault::from_panic(payload).into());
                }
            };
            let guard = ReleaseGuard::new(resource, release);
            let outcome = body.run().await;
            guard.release().await;
            outcome
        })
    }

    fn kind(&self) -> &'static str {
        "Bracket"
    }
}

/// Owns the resource until it is released, releasing it on drop otherwise.
struct ReleaseGuard<R, E, Rel>
where
    R: Send + 'static,
    E: Debug + Send + 'static,
    Rel: Fn(R) -> Effect<(), E> + Send + Sync + 'static,
{
    resource: Option<R>,
    release: Arc<Rel>,
}

impl<R, E, Rel> ReleaseGuard<R, E, Rel>
where
    R: Send + 'static,
    E: Debug + Send + 'static,
    Rel: Fn(R) -> Effect<(), E> + Send + Sync + 'static,
{
    fn new(resource: R, release: Arc<Rel>) -> Self {
        ReleaseGuard {
            resource: Some(resource),
            release,
        }
    }

    fn take(&mut self) -> Option<Effect<(), E>> {
        let resource = self.resource.take()?;
        let release = Arc::clone(&self.release);
        match std::panic::catch_unwind(AssertUnwindSafe(move || release(resource))) {
            Ok(effect) => Some(effect),
            Err(payload) => {
                let fault = Fault::from_panic(payload);
                tracing::warn!(%fault, "resource release panicked");
                None
            }
        }
    }

    async fn release(mut self) {
        if let Some(effect) = self.take() {
            report(effect.run().await);
        }
    }
}

impl<R, E, Rel> Drop for ReleaseGuard<R, E, Rel>
where
    R: Send + 'static,
    E: Debug + Send + 'static,
    Rel: Fn(R) -> Effect<(), E> + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let Some(effect) = self.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { report(effect.run().await) });
            }
            Err(error) => tracing::warn!(%error, "no runtime to release an abandoned resource"),
        }
    }
}

fn report<E: Debug>(outcome: Result<(), E>) {
    if let Err(error) = outcome {
        tracing::warn!(?error, "resource release failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestError;
    use crate::Scheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(u32) -> Effect<(), TestError> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Effect::unit()
        }
    }

    #[tokio::test]
    async fn test_release_after_success() {
        let released = Arc::new(AtomicUsize::new(0));
        let effect = bracket(Effect::pure(20u32), |n| Effect::pure(n + 1), counting(&released));

        assert_eq!(effect.run().await, Ok(21));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        assert_eq!(effect.run().await, Ok(21));
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_release_after_failure() {
        let released = Arc::new(AtomicUsize::new(0));
        let effect = bracket(
            Effect::pure(1u32),
            |_| Effect::<u32, _>::fail(TestError::failed("body")),
            counting(&released),
        );

        assert_eq!(effect.run().await, Err(TestError::failed("body")));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_acquire_skips_body_and_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let used = Arc::new(AtomicUsize::new(0));
        let body = {
            let used = Arc::clone(&used);
            move |_: &u32| {
                used.fetch_add(1, Ordering::SeqCst);
                Effect::pure(())
            }
        };
        let effect = bracket(Effect::fail(TestError::failed("acquire")), body, counting(&released));

        assert_eq!(effect.run().await, Err(TestError::failed("acquire")));
        assert_eq!(used.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_release_keeps_body_outcome() {
        let effect = bracket(
            Effect::pure(1u32),
            |n| Effect::pure(*n),
            |_| Effect::fail(TestError::failed("close")),
        );

        assert_eq!(effect.run().await, Ok(1));
        assert!(logs_contain("resource release failed"));
    }

    #[tokio::test]
    async fn test_panicking_body_builder_fails_and_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let effect = bracket(
            Effect::pure(1u32),
            |_| -> Effect<u32, TestError> { panic!("body builder") },
            counting(&released),
        );

        match effect.run().await {
            Err(TestError::Fault(Fault::Panicked { message })) => {
                assert!(message.contains("body builder"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_when_dropped_mid_flight() {
        let released = Arc::new(AtomicUsize::new(0));
        let effect = bracket(
            Effect::pure(1u32),
            |_| {
                Effect::<_, TestError>::from_async(&Scheduler::Inline, || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                })
            },
            counting(&released),
        );

        let abandoned = tokio::time::timeout(Duration::from_millis(10), effect.run()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
