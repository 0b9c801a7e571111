//! Recover combinators - turn failures into values or other effects.

use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};

/// Maps a failure to a success value.
pub(crate) struct Recover<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, E, F> Node<T, E> for Recover<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(E) -> T + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move { Ok(inner.run().await.unwrap_or_else(|e| f(e))) })
    }

    fn kind(&self) -> &'static str {
        "Recover"
    }
}

/// Replaces a failure with the outcome of another effect.
pub(crate) struct RecoverWith<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, E, F> Node<T, E> for RecoverWith<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(E) -> Effect<T, E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            match inner.run().await {
                Ok(value) => Ok(value),
                Err(error) => f(error).run().await,
            }
        })
    }

    fn kind(&self) -> &'static str {
        "RecoverWith"
    }
}
