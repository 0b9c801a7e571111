//! Tree-wide transforms over effect trees.
//!
//! Expressions rebuild themselves with a [`Rewrite`] applied to each child;
//! anything that is not an expression is a leaf and is wrapped as a whole.

use std::fmt::Display;
use std::sync::Arc;

use crate::effect::instrument::Hook;
use crate::effect::Effect;
use crate::retry::RetryPolicy;

pub(crate) type ErrorPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A lazily invoked builder of a branch.
pub(crate) type Supplier<T, E> = Arc<dyn Fn() -> Effect<T, E> + Send + Sync>;

pub(crate) enum Rewrite<E> {
    /// Apply a retry policy to every leaf, never to expression nodes.
    RetryEach {
        predicate: ErrorPredicate<E>,
        policy: RetryPolicy,
    },
    /// Wrap every node, leaves and expressions alike, with a hook.
    Instrument { context: Arc<str>, hook: Hook<E> },
}

impl<E> Clone for Rewrite<E> {
    fn clone(&self) -> Self {
        match self {
            Rewrite::RetryEach { predicate, policy } => Rewrite::RetryEach {
                predicate: Arc::clone(predicate),
                policy: policy.clone(),
            },
            Rewrite::Instrument { context, hook } => Rewrite::Instrument {
                context: Arc::clone(context),
                hook: Arc::clone(hook),
            },
        }
    }
}

impl<E> Rewrite<E>
where
    E: Send + 'static,
{
    pub(crate) fn retry_each<P>(predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Rewrite::RetryEach {
            predicate: Arc::new(predicate),
            policy,
        }
    }

    pub(crate) fn instrument(context: impl Into<Arc<str>>, hook: Hook<E>) -> Self {
        Rewrite::Instrument {
            context: context.into(),
            hook,
        }
    }

    /// Rewrite `effect`, recursing when it is an expression.
    pub(crate) fn apply<T>(&self, effect: &Effect<T, E>) -> Effect<T, E>
    where
        T: Send + 'static,
    {
        match effect.rewrite_with(self) {
            Some(rewritten) => rewritten,
            None => self.wrap(effect),
        }
    }

    /// The rewrite to use for the child at `label`.
    pub(crate) fn child(&self, label: impl Display) -> Self {
        match self {
            Rewrite::RetryEach { .. } => self.clone(),
            Rewrite::Instrument { context, hook } => Rewrite::Instrument {
                context: format!("{}/{}", context, label).into(),
                hook: Arc::clone(hook),
            },
        }
    }

    /// Finish an expression whose children have already been rewritten.
    pub(crate) fn finish<T>(&self, rebuilt: Effect<T, E>) -> Effect<T, E>
    where
        T: Send + 'static,
    {
        match self {
            Rewrite::RetryEach { .. } => rebuilt,
            Rewrite::Instrument { .. } => self.wrap(&rebuilt),
        }
    }

    /// Rewrite whatever a lazily invoked supplier builds.
    pub(crate) fn supplier<T>(&self, label: impl Display, supplier: &Supplier<T, E>) -> Supplier<T, E>
    where
        T: Send + 'static,
    {
        let rewrite = self.child(label);
        let supplier = Arc::clone(supplier);
        Arc::new(move || rewrite.apply(&supplier()))
    }

    fn wrap<T>(&self, effect: &Effect<T, E>) -> Effect<T, E>
    where
        T: Send + 'static,
    {
        match self {
            Rewrite::RetryEach { predicate, policy } => {
                effect.retry_shared(Arc::clone(predicate), policy.clone())
            }
            Rewrite::Instrument { context, hook } => {
                effect.hooked(Arc::clone(context), Arc::clone(hook))
            }
        }
    }
}
