//! FromFn constructor - a synchronous leaf computation.

use std::sync::Arc;

use crate::effect::{BoxFuture, Node};
use crate::fault::Fault;
use crate::scheduler::Scheduler;

/// Runs a synchronous closure on its scheduler.
pub(crate) struct FromFn<F> {
    pub(crate) scheduler: Scheduler,
    pub(crate) f: Arc<F>,
}

impl<T, E, F> Node<T, E> for FromFn<F>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let scheduler = self.scheduler.clone();
        let f = Arc::clone(&self.f);
        Box::pin(async move { scheduler.execute_blocking(move || f()).await })
    }

    fn kind(&self) -> &'static str {
        "FromFn"
    }
}
