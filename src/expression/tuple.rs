//! `Pair` and `Triple`: fixed-arity heterogeneous children.

use std::fmt;

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::retry::RetryPolicy;

use super::{indexed, private, Expression, Strategy};

/// Evaluates two children of different types into `(A, B)`.
///
/// The `keep_*` accessors still run both children but keep only one value,
/// for branches that are needed only for their effects.
///
/// # Example
///
/// ```rust
/// use tributary::{Effect, Expression, Fault, Pair};
///
/// # tokio_test::block_on(async {
/// let pair = Pair::<_, _, Fault>::seq(Effect::pure("id"), Effect::pure(42));
/// assert_eq!(pair.run().await, Ok(("id", 42)));
/// assert_eq!(pair.keep_right().run().await, Ok(42));
/// # });
/// ```
pub struct Pair<A, B, E> {
    strategy: Strategy,
    first: Effect<A, E>,
    second: Effect<B, E>,
}

impl<A, B, E> Pair<A, B, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    /// A pair with the given strategy.
    pub fn new(strategy: Strategy, first: Effect<A, E>, second: Effect<B, E>) -> Self {
        Pair {
            strategy,
            first,
            second,
        }
    }

    /// Evaluate both children concurrently.
    pub fn par(first: Effect<A, E>, second: Effect<B, E>) -> Self {
        Pair::new(Strategy::Parallel, first, second)
    }

    /// Evaluate `first`, then `second`.
    pub fn seq(first: Effect<A, E>, second: Effect<B, E>) -> Self {
        Pair::new(Strategy::Sequential, first, second)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Run both, keep the first value.
    pub fn keep_left(&self) -> Effect<A, E> {
        self.clone().into_effect().map(|(a, _)| a)
    }

    /// Run both, keep the second value.
    pub fn keep_right(&self) -> Effect<B, E> {
        self.clone().into_effect().map(|(_, b)| b)
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        let kind = self.kind();
        Pair {
            strategy: self.strategy,
            first: rewrite.child(indexed(kind, 0)).apply(&self.first),
            second: rewrite.child(indexed(kind, 1)).apply(&self.second),
        }
    }
}

impl<A, B, E> Node<(A, B), E> for Pair<A, B, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<(A, B), E>> {
        let first = self.first.run();
        let second = self.second.clone();
        match self.strategy {
            Strategy::Parallel => Box::pin(async move {
                let (a, b) = futures::join!(first, second.run());
                Ok((a?, b?))
            }),
            Strategy::Sequential => Box::pin(async move {
                let a = first.await?;
                let b = second.run().await?;
                Ok((a, b))
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "Pair.par",
            Strategy::Sequential => "Pair.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<(A, B), E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

/// Evaluates three children of different types into `(A, B, C)`.
pub struct Triple<A, B, C, E> {
    strategy: Strategy,
    first: Effect<A, E>,
    second: Effect<B, E>,
    third: Effect<C, E>,
}

impl<A, B, C, E> Triple<A, B, C, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    /// A triple with the given strategy.
    pub fn new(
        strategy: Strategy,
        first: Effect<A, E>,
        second: Effect<B, E>,
        third: Effect<C, E>,
    ) -> Self {
        Triple {
            strategy,
            first,
            second,
            third,
        }
    }

    /// Evaluate all three children concurrently.
    pub fn par(first: Effect<A, E>, second: Effect<B, E>, third: Effect<C, E>) -> Self {
        Triple::new(Strategy::Parallel, first, second, third)
    }

    /// Evaluate the children in declared order.
    pub fn seq(first: Effect<A, E>, second: Effect<B, E>, third: Effect<C, E>) -> Self {
        Triple::new(Strategy::Sequential, first, second, third)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Run all three, keep the first value.
    pub fn keep_first(&self) -> Effect<A, E> {
        self.clone().into_effect().map(|(a, _, _)| a)
    }

    /// Run all three, keep the second value.
    pub fn keep_second(&self) -> Effect<B, E> {
        self.clone().into_effect().map(|(_, b, _)| b)
    }

    /// Run all three, keep the third value.
    pub fn keep_third(&self) -> Effect<C, E> {
        self.clone().into_effect().map(|(_, _, c)| c)
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        let kind = self.kind();
        Triple {
            strategy: self.strategy,
            first: rewrite.child(indexed(kind, 0)).apply(&self.first),
            second: rewrite.child(indexed(kind, 1)).apply(&self.second),
            third: rewrite.child(indexed(kind, 2)).apply(&self.third),
        }
    }
}

impl<A, B, C, E> Node<(A, B, C), E> for Triple<A, B, C, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<(A, B, C), E>> {
        let first = self.first.run();
        let second = self.second.clone();
        let third = self.third.clone();
        match self.strategy {
            Strategy::Parallel => Box::pin(async move {
                let (a, b, c) = futures::join!(first, second.run(), third.run());
                Ok((a?, b?, c?))
            }),
            Strategy::Sequential => Box::pin(async move {
                let a = first.await?;
                let b = second.run().await?;
                let c = third.run().await?;
                Ok((a, b, c))
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "Triple.par",
            Strategy::Sequential => "Triple.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<(A, B, C), E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<A, B, E> Clone for Pair<A, B, E> {
    fn clone(&self) -> Self {
        Pair {
            strategy: self.strategy,
            first: self.first.clone(),
            second: self.second.clone(),
        }
    }
}

impl<A, B, C, E> Clone for Triple<A, B, C, E> {
    fn clone(&self) -> Self {
        Triple {
            strategy: self.strategy,
            first: self.first.clone(),
            second: self.second.clone(),
            third: self.third.clone(),
        }
    }
}

impl<A, B, E> fmt::Debug for Pair<A, B, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pair").field("strategy", &self.strategy).finish()
    }
}

impl<A, B, C, E> fmt::Debug for Triple<A, B, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triple").field("strategy", &self.strategy).finish()
    }
}

impl<A, B, E> private::Sealed for Pair<A, B, E> {}
impl<A, B, C, E> private::Sealed for Triple<A, B, C, E> {}

impl<A, B, E> Expression for Pair<A, B, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    type Output = (A, B);
    type Error = E;

    fn into_effect(self) -> Effect<(A, B), E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<A, B, C, E> Expression for Triple<A, B, C, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    type Output = (A, B, C);
    type Error = E;

    fn into_effect(self) -> Effect<(A, B, C), E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<A, B, E> From<Pair<A, B, E>> for Effect<(A, B), E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    fn from(expression: Pair<A, B, E>) -> Self {
        expression.into_effect()
    }
}

impl<A, B, C, E> From<Triple<A, B, C, E>> for Effect<(A, B, C), E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    fn from(expression: Triple<A, B, C, E>) -> Self {
        expression.into_effect()
    }
}
