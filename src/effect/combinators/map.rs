//! Map combinators - transform the success value of an effect.

use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};

/// Applies `f` to the success value. Failures pass through untouched.
pub(crate) struct Map<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, U, E, F> Node<U, E> for Map<T, E, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<U, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            let value = inner.run().await?;
            Ok(f(value))
        })
    }

    fn kind(&self) -> &'static str {
        "Map"
    }
}

/// Applies a fallible `f` to the success value.
pub(crate) struct TryMap<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, U, E, F> Node<U, E> for TryMap<T, E, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<U, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move { f(inner.run().await?) })
    }

    fn kind(&self) -> &'static str {
        "TryMap"
    }
}
