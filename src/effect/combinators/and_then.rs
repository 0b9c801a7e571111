//! AndThen combinators - chain dependent effects.

use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};

/// Runs `f(value)` after the inner effect succeeds.
///
/// The continuation is never built when the inner effect fails.
pub(crate) struct AndThen<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, U, E, F> Node<U, E> for AndThen<T, E, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Effect<U, E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<U, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            let value = inner.run().await?;
            f(value).run().await
        })
    }

    fn kind(&self) -> &'static str {
        "AndThen"
    }
}

/// Continues with one of two functions depending on the inner outcome.
pub(crate) struct AndThenOrElse<T, E, S, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) on_success: Arc<S>,
    pub(crate) on_failure: Arc<F>,
}

impl<T, U, E, S, F> Node<U, E> for AndThenOrElse<T, E, S, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    S: Fn(T) -> Effect<U, E> + Send + Sync + 'static,
    F: Fn(E) -> Effect<U, E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<U, E>> {
        let inner = self.inner.clone();
        let on_success = Arc::clone(&self.on_success);
        let on_failure = Arc::clone(&self.on_failure);
        Box::pin(async move {
            let next = match inner.run().await {
                Ok(value) => on_success(value),
                Err(error) => on_failure(error),
            };
            next.run().await
        })
    }

    fn kind(&self) -> &'static str {
        "AndThenOrElse"
    }
}
