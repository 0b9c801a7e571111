//! MapErr combinator - transforms the failure of an effect.

use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, Node};

pub(crate) struct MapErr<T, E, F> {
    pub(crate) inner: Effect<T, E>,
    pub(crate) f: Arc<F>,
}

impl<T, E, E2, F> Node<T, E2> for MapErr<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    E2: Send + 'static,
    F: Fn(E) -> E2 + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E2>> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move { inner.run().await.map_err(|e| f(e)) })
    }

    fn kind(&self) -> &'static str {
        "MapErr"
    }
}
