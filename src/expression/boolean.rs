//! `AllOf` and `AnyOf`: boolean reductions.

use std::fmt;
use std::sync::Arc;

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::retry::RetryPolicy;

use super::{indexed, private, run_all, Expression, Strategy};

/// True iff every child is true. Empty is true.
///
/// Sequential evaluation stops at the first `false`.
///
/// # Example
///
/// ```rust
/// use tributary::{AllOf, Effect, Expression, Fault};
///
/// # tokio_test::block_on(async {
/// let checks = AllOf::<Fault>::par([Effect::always_true(), Effect::always_true()]);
/// assert_eq!(checks.run().await, Ok(true));
/// assert_eq!(AllOf::<Fault>::seq([]).run().await, Ok(true));
/// # });
/// ```
pub struct AllOf<E> {
    strategy: Strategy,
    children: Arc<[Effect<bool, E>]>,
}

/// True iff some child is true. Empty is false.
///
/// Sequential evaluation stops at the first `true`.
pub struct AnyOf<E> {
    strategy: Strategy,
    children: Arc<[Effect<bool, E>]>,
}

/// Reduce towards `decisive`: the result is `decisive` as soon as one child
/// yields it, its negation otherwise.
async fn reduce<E>(children: Arc<[Effect<bool, E>]>, strategy: Strategy, decisive: bool) -> Result<bool, E>
where
    E: Send + 'static,
{
    match strategy {
        Strategy::Parallel => {
            let values = run_all(&children, strategy).await?;
            Ok(if values.contains(&decisive) { decisive } else { !decisive })
        }
        Strategy::Sequential => {
            for child in children.iter() {
                if child.run().await? == decisive {
                    return Ok(decisive);
                }
            }
            Ok(!decisive)
        }
    }
}

fn rebuild_children<E>(
    children: &[Effect<bool, E>],
    kind: &str,
    rewrite: &Rewrite<E>,
) -> Arc<[Effect<bool, E>]>
where
    E: Send + 'static,
{
    children
        .iter()
        .enumerate()
        .map(|(i, child)| rewrite.child(indexed(kind, i)).apply(child))
        .collect()
}

impl<E> AllOf<E>
where
    E: Send + 'static,
{
    /// An `AllOf` over `children` with the given strategy.
    pub fn new<I>(strategy: Strategy, children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AllOf {
            strategy,
            children: children.into_iter().collect(),
        }
    }

    /// Evaluate every child concurrently.
    pub fn par<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AllOf::new(Strategy::Parallel, children)
    }

    /// Evaluate children in order, stopping at the first `false`.
    pub fn seq<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AllOf::new(Strategy::Sequential, children)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The children, in construction order.
    pub fn children(&self) -> &[Effect<bool, E>] {
        &self.children
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        AllOf {
            strategy: self.strategy,
            children: rebuild_children(&self.children, self.kind(), rewrite),
        }
    }
}

impl<E> AnyOf<E>
where
    E: Send + 'static,
{
    /// An `AnyOf` over `children` with the given strategy.
    pub fn new<I>(strategy: Strategy, children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AnyOf {
            strategy,
            children: children.into_iter().collect(),
        }
    }

    /// Evaluate every child concurrently.
    pub fn par<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AnyOf::new(Strategy::Parallel, children)
    }

    /// Evaluate children in order, stopping at the first `true`.
    pub fn seq<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<bool, E>>,
    {
        AnyOf::new(Strategy::Sequential, children)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The children, in construction order.
    pub fn children(&self) -> &[Effect<bool, E>] {
        &self.children
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        AnyOf {
            strategy: self.strategy,
            children: rebuild_children(&self.children, self.kind(), rewrite),
        }
    }
}

impl<E> Node<bool, E> for AllOf<E>
where
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<bool, E>> {
        Box::pin(reduce(Arc::clone(&self.children), self.strategy, false))
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "AllOf.par",
            Strategy::Sequential => "AllOf.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<bool, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<E> Node<bool, E> for AnyOf<E>
where
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<bool, E>> {
        Box::pin(reduce(Arc::clone(&self.children), self.strategy, true))
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "AnyOf.par",
            Strategy::Sequential => "AnyOf.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<bool, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<E> Clone for AllOf<E> {
    fn clone(&self) -> Self {
        AllOf {
            strategy: self.strategy,
            children: Arc::clone(&self.children),
        }
    }
}

impl<E> Clone for AnyOf<E> {
    fn clone(&self) -> Self {
        AnyOf {
            strategy: self.strategy,
            children: Arc::clone(&self.children),
        }
    }
}

impl<E> fmt::Debug for AllOf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf")
            .field("strategy", &self.strategy)
            .field("children", &self.children.len())
            .finish()
    }
}

impl<E> fmt::Debug for AnyOf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyOf")
            .field("strategy", &self.strategy)
            .field("children", &self.children.len())
            .finish()
    }
}

impl<E> private::Sealed for AllOf<E> {}
impl<E> private::Sealed for AnyOf<E> {}

impl<E> Expression for AllOf<E>
where
    E: Send + 'static,
{
    type Output = bool;
    type Error = E;

    fn into_effect(self) -> Effect<bool, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<E> Expression for AnyOf<E>
where
    E: Send + 'static,
{
    type Output = bool;
    type Error = E;

    fn into_effect(self) -> Effect<bool, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<E: Send + 'static> From<AllOf<E>> for Effect<bool, E> {
    fn from(expression: AllOf<E>) -> Self {
        expression.into_effect()
    }
}

impl<E: Send + 'static> From<AnyOf<E>> for Effect<bool, E> {
    fn from(expression: AnyOf<E>) -> Self {
        expression.into_effect()
    }
}
