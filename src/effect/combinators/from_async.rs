//! FromAsync constructor - an asynchronous leaf computation.

use std::future::Future;
use std::sync::Arc;

use crate::effect::{BoxFuture, Node};
use crate::fault::Fault;
use crate::scheduler::Scheduler;

/// Calls an async closure on every run and drives the future on its scheduler.
pub(crate) struct FromAsync<F> {
    pub(crate) scheduler: Scheduler,
    pub(crate) f: Arc<F>,
}

impl<T, E, F, Fut> Node<T, E> for FromAsync<F>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let scheduler = self.scheduler.clone();
        let f = Arc::clone(&self.f);
        // The closure is called inside the driven future so that a panic while
        // building it is captured like any other panic.
        Box::pin(async move { scheduler.execute(async move { f().await }).await })
    }

    fn kind(&self) -> &'static str {
        "FromAsync"
    }
}
