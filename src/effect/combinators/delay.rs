//! Delay constructor - the timing primitive behind backoff.

use std::time::Duration;

use crate::effect::{BoxFuture, Node};

pub(crate) struct Delay {
    pub(crate) duration: Duration,
}

impl<E> Node<(), E> for Delay
where
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<(), E>> {
        if self.duration.is_zero() {
            return Box::pin(futures::future::ready(Ok(())));
        }
        let duration = self.duration;
        Box::pin(async move {
            tokio::time::sleep(duration).await;
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "Delay"
    }
}
