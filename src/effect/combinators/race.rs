//! Race combinator - adopt the first outcome, let the others finish.

use std::sync::Arc;

use futures::future::{join_all, select_all};
use tokio::runtime::Handle;

use crate::effect::{BoxFuture, Effect, Node};

/// Always holds at least one contender.
pub(crate) struct Race<T, E> {
    pub(crate) contenders: Arc<[Effect<T, E>]>,
}

impl<T, E> Node<T, E> for Race<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let contenders = Arc::clone(&self.contenders);
        Box::pin(async move {
            let running: Vec<_> = contenders.iter().map(Effect::run).collect();
            let (outcome, winner, losers) = select_all(running).await;
            tracing::trace!(winner, losers = losers.len(), "race settled");
            detach(losers);
            outcome
        })
    }

    fn kind(&self) -> &'static str {
        "Race"
    }
}

/// Keep the losing futures running on the current runtime.
fn detach<T, E>(losers: Vec<BoxFuture<'static, Result<T, E>>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    if losers.is_empty() {
        return;
    }
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                join_all(losers).await;
            });
        }
        Err(_) => {
            tracing::warn!(
                losers = losers.len(),
                "no runtime to finish race losers on; they are dropped"
            );
        }
    }
}
