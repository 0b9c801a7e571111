//! The retry and repeat loops.
//!
//! Each attempt runs a fresh evaluation of the effect. Between attempts the
//! loop waits on [`Effect::delay`], so a zero delay re-attempts immediately
//! and anything longer suspends on the runtime timer.

use std::sync::Arc;

use crate::effect::rewrite::{ErrorPredicate, Rewrite};
use crate::effect::{BoxFuture, Effect, Node};

use super::policy::RetryPolicy;
use super::status::RetryStatus;

type Attempt<T, E> = Arc<dyn Fn(&RetryStatus) -> Effect<T, E> + Send + Sync>;

struct Retry<T, E> {
    attempt: Attempt<T, E>,
    predicate: ErrorPredicate<E>,
    policy: RetryPolicy,
}

impl<T, E> Node<T, E> for Retry<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let attempt = Arc::clone(&self.attempt);
        let predicate = Arc::clone(&self.predicate);
        let policy = self.policy.clone();
        Box::pin(async move {
            let mut status = RetryStatus::initial();
            loop {
                let error = match attempt(&status).run().await {
                    Ok(value) => return Ok(value),
                    Err(error) => error,
                };
                if !predicate(&error) {
                    return Err(error);
                }
                let Some(delay) = policy.delay(&status) else {
                    tracing::debug!(attempts = status.counter() + 1, "retry policy gave up");
                    return Err(error);
                };
                tracing::debug!(
                    attempt = status.counter(),
                    ?delay,
                    cumulative = ?status.cumulative_delay(),
                    "attempt failed, retrying"
                );
                Effect::<(), E>::delay(delay).run().await?;
                status = status.advance(delay);
            }
        })
    }

    fn kind(&self) -> &'static str {
        "Retry"
    }
}

struct Repeat<T, E> {
    attempt: Attempt<T, E>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    policy: RetryPolicy,
}

impl<T, E> Node<T, E> for Repeat<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let attempt = Arc::clone(&self.attempt);
        let predicate = Arc::clone(&self.predicate);
        let policy = self.policy.clone();
        Box::pin(async move {
            let mut status = RetryStatus::initial();
            loop {
                let value = attempt(&status).run().await?;
                if !predicate(&value) {
                    return Ok(value);
                }
                let Some(delay) = policy.delay(&status) else {
                    tracing::debug!(runs = status.counter() + 1, "repeat policy gave up");
                    return Ok(value);
                };
                tracing::debug!(
                    attempt = status.counter(),
                    ?delay,
                    cumulative = ?status.cumulative_delay(),
                    "repeating"
                );
                Effect::<(), E>::delay(delay).run().await?;
                status = status.advance(delay);
            }
        })
    }

    fn kind(&self) -> &'static str {
        "Repeat"
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Re-run this effect while it fails with an error accepted by `predicate`
    /// and `policy` grants another delay.
    ///
    /// When the predicate rejects an error, or the policy gives up, the last
    /// failure is reported as is.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use tributary::{Effect, Fault, RetryPolicy, Scheduler};
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let counter = Arc::clone(&calls);
    ///
    /// let flaky = Effect::<_, Fault>::from_fn(&Scheduler::Inline, move || {
    ///     match counter.fetch_add(1, Ordering::SeqCst) {
    ///         0 | 1 => Err(Fault::Aborted),
    ///         n => Ok(n),
    ///     }
    /// });
    ///
    /// let effect = flaky.retry(|_| true, RetryPolicy::limit_retries(3));
    /// assert_eq!(effect.run().await, Ok(2));
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// # });
    /// ```
    pub fn retry<P>(&self, predicate: P, policy: RetryPolicy) -> Effect<T, E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_shared(Arc::new(predicate), policy)
    }

    /// Like [`retry`](Effect::retry), with the effect for each attempt built
    /// from the current [`RetryStatus`].
    pub fn retrying<P, F>(predicate: P, policy: RetryPolicy, factory: F) -> Effect<T, E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(&RetryStatus) -> Effect<T, E> + Send + Sync + 'static,
    {
        Effect::from_node(Retry {
            attempt: Arc::new(factory),
            predicate: Arc::new(predicate),
            policy,
        })
    }

    /// Re-run this effect while its success value satisfies `predicate` and
    /// `policy` grants another delay, then yield the last value.
    ///
    /// A failure stops the loop immediately.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use tributary::{Effect, Fault, RetryPolicy, Scheduler};
    ///
    /// # tokio_test::block_on(async {
    /// let polls = Arc::new(AtomicU32::new(0));
    /// let counter = Arc::clone(&polls);
    ///
    /// // Poll until the job reports at least 3, giving up after 10 polls.
    /// let progress = Effect::<_, Fault>::from_fn(&Scheduler::Inline, move || {
    ///     Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    /// });
    /// let done = progress.repeat(|p| *p < 3, RetryPolicy::limit_retries(10));
    ///
    /// assert_eq!(done.run().await, Ok(3));
    /// # });
    /// ```
    pub fn repeat<P>(&self, predicate: P, policy: RetryPolicy) -> Effect<T, E>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let effect = self.clone();
        Effect::repeating(predicate, policy, move |_| effect.clone())
    }

    /// Like [`repeat`](Effect::repeat), with the effect for each run built
    /// from the current [`RetryStatus`].
    pub fn repeating<P, F>(predicate: P, policy: RetryPolicy, factory: F) -> Effect<T, E>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&RetryStatus) -> Effect<T, E> + Send + Sync + 'static,
    {
        Effect::from_node(Repeat {
            attempt: Arc::new(factory),
            predicate: Arc::new(predicate),
            policy,
        })
    }

    /// Apply [`retry`](Effect::retry) to every leaf of this tree.
    ///
    /// Expressions are rebuilt with retried children and are never retried
    /// as a whole; on any other effect this is the same as `retry`.
    pub fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Effect<T, E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Rewrite::retry_each(predicate, policy).apply(self)
    }

    pub(crate) fn retry_shared(&self, predicate: ErrorPredicate<E>, policy: RetryPolicy) -> Effect<T, E> {
        let effect = self.clone();
        Effect::from_node(Retry {
            attempt: Arc::new(move |_: &RetryStatus| effect.clone()),
            predicate,
            policy,
        })
    }
}
