//! Completion hooks for diagnostics.
//!
//! [`Effect::instrument`] returns a new tree in which every node, nested
//! expressions included, reports its completion to a [`Hook`]. Each node gets
//! a context naming its position: the root carries the context passed in, and
//! children extend it with their label, e.g. `checkout/AllOf.par[1]` or
//! `order/Object.seq[total]`.
//!
//! What happens to a completion (formatting, storage) is up to the hook. The
//! stock [`tracing_hook`] logs each one through `tracing`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use tributary::instrument::{hook, Completion};
//! use tributary::{AllOf, Effect, Expression, Fault};
//!
//! # tokio_test::block_on(async {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let check = AllOf::<Fault>::par([Effect::always_true(), Effect::always_true()])
//!     .into_effect()
//!     .instrument(
//!         "checks",
//!         hook(move |completion: &Completion<'_, Fault>| {
//!             sink.lock().unwrap().push(completion.context.to_string());
//!         }),
//!     );
//!
//! assert_eq!(check.run().await, Ok(true));
//! let mut contexts = seen.lock().unwrap().clone();
//! contexts.sort();
//! assert_eq!(contexts, ["checks", "checks/AllOf.par[0]", "checks/AllOf.par[1]"]);
//! # });
//! ```

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::effect::combinators::observe;
use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};

/// A completion callback shared by every node of an instrumented tree.
pub type Hook<E> = Arc<dyn Fn(&Completion<'_, E>) + Send + Sync>;

/// How an instrumented node completed.
pub enum Outcome<'a, E> {
    /// The node succeeded. The value can be inspected with `downcast_ref`.
    Success(&'a dyn Any),
    /// The node failed.
    Failure(&'a E),
}

impl<E: Debug> Debug for Outcome<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success(_) => f.write_str("Success(..)"),
            Outcome::Failure(error) => f.debug_tuple("Failure").field(error).finish(),
        }
    }
}

impl<E> Outcome<'_, E> {
    /// Returns true for a successful completion.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// One completion event.
#[derive(Debug)]
pub struct Completion<'a, E> {
    /// Position of the node in the instrumented tree.
    pub context: &'a str,
    /// The node's kind, e.g. `"AllOf.par"`.
    pub kind: &'static str,
    /// What the node produced.
    pub outcome: Outcome<'a, E>,
    /// Time from start to completion.
    pub elapsed: Duration,
}

/// Turn a closure into a [`Hook`].
pub fn hook<E, F>(f: F) -> Hook<E>
where
    F: Fn(&Completion<'_, E>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A hook logging successes at `debug` and failures at `warn`.
pub fn tracing_hook<E>() -> Hook<E>
where
    E: Debug + 'static,
{
    Arc::new(|completion: &Completion<'_, E>| match &completion.outcome {
        Outcome::Success(_) => tracing::debug!(
            context = completion.context,
            kind = completion.kind,
            elapsed = ?completion.elapsed,
            "effect succeeded"
        ),
        Outcome::Failure(error) => tracing::warn!(
            context = completion.context,
            kind = completion.kind,
            elapsed = ?completion.elapsed,
            ?error,
            "effect failed"
        ),
    })
}

struct Hooked<T, E> {
    inner: Effect<T, E>,
    context: Arc<str>,
    hook: Hook<E>,
}

impl<T, E> Node<T, E> for Hooked<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let context = Arc::clone(&self.context);
        let hook = Arc::clone(&self.hook);
        Box::pin(async move {
            let started = Instant::now();
            let result = inner.run().await;
            let outcome = match &result {
                Ok(value) => Outcome::Success(value as &dyn Any),
                Err(error) => Outcome::Failure(error),
            };
            let completion = Completion {
                context: &context,
                kind: inner.kind(),
                outcome,
                elapsed: started.elapsed(),
            };
            observe("instrument", || hook(&completion));
            result
        })
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<T, E>> {
        self.inner
            .rewrite_with(rewrite)
            .map(|rebuilt| rebuilt.hooked(Arc::clone(&self.context), Arc::clone(&self.hook)))
    }
}

struct InSpan<T, E> {
    inner: Effect<T, E>,
    span: tracing::Span,
}

impl<T, E> Node<T, E> for InSpan<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let inner = self.inner.clone();
        let span = self.span.clone();
        Box::pin(tracing::Instrument::instrument(inner.run(), span))
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Report the completion of this effect, and of every node beneath it
    /// when it is an expression, to `hook`.
    ///
    /// A panicking hook is logged and ignored.
    pub fn instrument(&self, context: impl Into<Arc<str>>, hook: Hook<E>) -> Effect<T, E> {
        Rewrite::instrument(context, hook).apply(self)
    }

    /// Run every evaluation inside `span`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tributary::{Effect, Fault};
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<_, Fault>::pure(1).in_span(tracing::info_span!("load_config"));
    /// assert_eq!(effect.run().await, Ok(1));
    /// # });
    /// ```
    pub fn in_span(&self, span: tracing::Span) -> Effect<T, E> {
        Effect::from_node(InSpan {
            inner: self.clone(),
            span,
        })
    }

    pub(crate) fn hooked(&self, context: Arc<str>, hook: Hook<E>) -> Effect<T, E> {
        Effect::from_node(Hooked {
            inner: self.clone(),
            context,
            hook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    fn recording() -> (Hook<Fault>, Arc<Mutex<Vec<(String, bool)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook = hook(move |completion: &Completion<'_, Fault>| {
            sink.lock()
                .unwrap()
                .push((completion.context.to_string(), completion.outcome.is_success()));
        });
        (hook, seen)
    }

    #[tokio::test]
    async fn test_leaf_reports_success_once() {
        let (hook, seen) = recording();
        let effect = Effect::<_, Fault>::pure(3).instrument("leaf", hook);

        assert_eq!(effect.run().await, Ok(3));
        assert_eq!(*seen.lock().unwrap(), vec![("leaf".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_failure_reported_and_preserved() {
        let (hook, seen) = recording();
        let effect = Effect::<u8, _>::fail(Fault::Aborted).instrument("leaf", hook);

        assert_eq!(effect.run().await, Err(Fault::Aborted));
        assert_eq!(*seen.lock().unwrap(), vec![("leaf".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_success_value_is_downcastable() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let effect = Effect::<u32, Fault>::pure(99).instrument(
            "value",
            hook(move |completion: &Completion<'_, Fault>| {
                if let Outcome::Success(value) = completion.outcome {
                    *sink.lock().unwrap() = value.downcast_ref::<u32>().copied();
                }
            }),
        );

        effect.run().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(99));
    }

    #[tokio::test]
    async fn test_panicking_hook_does_not_change_outcome() {
        let effect = Effect::<_, Fault>::pure("kept").instrument(
            "boom",
            hook(|_: &Completion<'_, Fault>| panic!("hook exploded")),
        );

        assert_eq!(effect.run().await, Ok("kept"));
    }

    #[tokio::test]
    async fn test_tracing_hook_passes_outcome_through() {
        let ok = Effect::<_, Fault>::pure(1).instrument("ok", tracing_hook());
        let failed = Effect::<i32, _>::fail(Fault::Aborted).instrument("failed", tracing_hook());

        assert_eq!(ok.run().await, Ok(1));
        assert_eq!(failed.run().await, Err(Fault::Aborted));
    }

    #[tokio::test]
    async fn test_kind_is_transparent() {
        let (hook, _) = recording();
        let effect = Effect::<_, Fault>::pure(1).map(|x| x + 1).instrument("m", hook);
        assert_eq!(effect.kind(), "Map");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_in_span_wraps_evaluation() {
        let effect = Effect::<_, Fault>::pure(5)
            .tap(|value| tracing::info!(value = *value, "loaded"))
            .in_span(tracing::info_span!("load_settings"));

        assert_eq!(effect.run().await, Ok(5));
        assert_eq!(effect.kind(), "Tap");
        assert!(logs_contain("load_settings"));
    }
}
