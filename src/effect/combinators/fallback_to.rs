//! FallbackTo combinator - best-effort alternative on failure.

use crate::effect::{BoxFuture, Effect, Node};

/// Tries `fallback` when `primary` fails.
///
/// If the fallback fails as well, the primary's failure is reported.
pub(crate) struct FallbackTo<T, E> {
    pub(crate) primary: Effect<T, E>,
    pub(crate) fallback: Effect<T, E>,
}

impl<T, E> Node<T, E> for FallbackTo<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let primary = self.primary.clone();
        let fallback = self.fallback.clone();
        Box::pin(async move {
            match primary.run().await {
                Ok(value) => Ok(value),
                Err(original) => fallback.run().await.or(Err(original)),
            }
        })
    }

    fn kind(&self) -> &'static str {
        "FallbackTo"
    }
}
