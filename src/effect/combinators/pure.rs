//! Pure constructor - an effect that always succeeds with a value.

use crate::effect::{BoxFuture, Node};

/// Succeeds with a clone of `value` on every run.
pub(crate) struct Pure<T> {
    pub(crate) value: T,
}

impl<T, E> Node<T, E> for Pure<T>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        Box::pin(futures::future::ready(Ok(self.value.clone())))
    }

    fn kind(&self) -> &'static str {
        "Pure"
    }
}
