//! Defer constructor - builds a fresh effect on every run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;

pub(crate) struct Defer<T, E> {
    pub(crate) build: Arc<dyn Fn() -> Effect<T, E> + Send + Sync>,
}

impl<T, E> Node<T, E> for Defer<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let build = Arc::clone(&self.build);
        Box::pin(async move {
            match std::panic::catch_unwind(AssertUnwindSafe(|| build())) {
                Ok(effect) => effect.run().await,
                Err(payload) => Err(Fault::from_panic(payload).into()),
            }
        })
    }

    fn kind(&self) -> &'static str {
        "Defer"
    }
}
