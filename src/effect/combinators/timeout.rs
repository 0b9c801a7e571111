//! Timeout combinator - fail when a deadline elapses first.

use std::time::Duration;

use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;

pub(crate) struct Timeout<T, E> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) after: Duration,
}

impl<T, E> Node<T, E> for Timeout<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let after = self.after;
        Box::pin(async move {
            match tokio::time::timeout(after, inner.run()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Fault::timeout(after).into()),
            }
        })
    }

    fn kind(&self) -> &'static str {
        "Timeout"
    }
}
