//! Fail constructors - effects that always fail.

use std::sync::Arc;

use crate::effect::{BoxFuture, Node};

/// Fails with a clone of `error` on every run.
pub(crate) struct Fail<E> {
    pub(crate) error: E,
}

impl<T, E> Node<T, E> for Fail<E>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        Box::pin(futures::future::ready(Err(self.error.clone())))
    }

    fn kind(&self) -> &'static str {
        "Fail"
    }
}

/// Fails with a freshly built error on every run.
pub(crate) struct FailWith<E> {
    pub(crate) make_error: Arc<dyn Fn() -> E + Send + Sync>,
}

impl<T, E> Node<T, E> for FailWith<E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let make_error = Arc::clone(&self.make_error);
        Box::pin(async move { Err(make_error()) })
    }

    fn kind(&self) -> &'static str {
        "Fail"
    }
}
