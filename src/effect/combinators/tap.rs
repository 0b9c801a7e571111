//! Tap combinators - observe an outcome without changing it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;

/// Calls `f` with the success value, then yields the value unchanged.
pub(crate) struct Tap<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, E, F> Node<T, E> for Tap<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            let value = inner.run().await?;
            observe("tap", || f(&value));
            Ok(value)
        })
    }

    fn kind(&self) -> &'static str {
        "Tap"
    }
}

/// Calls `f` with the failure, then yields the failure unchanged.
pub(crate) struct TapErr<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, E, F> Node<T, E> for TapErr<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            let error = match inner.run().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            observe("tap_err", || f(&error));
            Err(error)
        })
    }

    fn kind(&self) -> &'static str {
        "TapErr"
    }
}

/// Run a caller-supplied side effect, logging instead of propagating a panic.
pub(crate) fn observe<F>(callback: &'static str, f: F)
where
    F: FnOnce(),
{
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        let fault = Fault::from_panic(payload);
        tracing::warn!(callback, %fault, "callback panicked; outcome left unchanged");
    }
}
