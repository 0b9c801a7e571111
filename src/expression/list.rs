//! `List`: an ordered sequence of homogeneous children.

use std::fmt;
use std::sync::Arc;

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::retry::RetryPolicy;

use super::{indexed, private, run_all, Expression, Strategy};

/// Evaluates to the children's values, in construction order.
///
/// The order of the result never depends on completion order: in a parallel
/// list a slow first child still lands at index 0.
///
/// # Example
///
/// ```rust
/// use tributary::{Effect, Expression, Fault, List};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let slow = Effect::<(), Fault>::delay(Duration::from_millis(20)).map(|_| "slow");
/// let fast = Effect::pure("fast");
///
/// let list = List::par([slow, fast]);
/// assert_eq!(list.run().await, Ok(vec!["slow", "fast"]));
///
/// let longer = list.append(Effect::pure("third"));
/// assert_eq!(longer.len(), 3);
/// assert_eq!(list.len(), 2);
/// # });
/// ```
pub struct List<T, E> {
    strategy: Strategy,
    children: Arc<[Effect<T, E>]>,
}

impl<T, E> List<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// A list over `children` with the given strategy.
    pub fn new<I>(strategy: Strategy, children: I) -> Self
    where
        I: IntoIterator<Item = Effect<T, E>>,
    {
        List {
            strategy,
            children: children.into_iter().collect(),
        }
    }

    /// Evaluate every child concurrently.
    pub fn par<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<T, E>>,
    {
        List::new(Strategy::Parallel, children)
    }

    /// Evaluate children in order, stopping at the first failure.
    pub fn seq<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Effect<T, E>>,
    {
        List::new(Strategy::Sequential, children)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The children, in construction order.
    pub fn children(&self) -> &[Effect<T, E>] {
        &self.children
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true when there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The first child.
    pub fn head(&self) -> Option<&Effect<T, E>> {
        self.children.first()
    }

    /// Every child but the first, with the same strategy.
    pub fn tail(&self) -> List<T, E> {
        List::new(self.strategy, self.children.iter().skip(1).cloned())
    }

    /// A new list with `child` added at the end.
    #[must_use]
    pub fn append(&self, child: Effect<T, E>) -> List<T, E> {
        List::new(
            self.strategy,
            self.children.iter().cloned().chain(std::iter::once(child)),
        )
    }

    /// An effect adopting the outcome of whichever child finishes first.
    ///
    /// `None` for an empty list. See [`Effect::race`].
    pub fn race(&self) -> Option<Effect<T, E>> {
        let (first, others) = self.children.split_first()?;
        Some(Effect::race(first.clone(), others.iter().cloned()))
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        self.rebuild_labelled(self.kind(), rewrite)
    }

    /// Rebuild with children labelled `kind[..]`.
    pub(crate) fn rebuild_labelled(&self, kind: &str, rewrite: &Rewrite<E>) -> Self {
        List::new(
            self.strategy,
            self.children
                .iter()
                .enumerate()
                .map(|(i, child)| rewrite.child(indexed(kind, i)).apply(child)),
        )
    }
}

impl<T, E> Node<Vec<T>, E> for List<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<Vec<T>, E>> {
        let children = Arc::clone(&self.children);
        let strategy = self.strategy;
        Box::pin(async move { run_all(&children, strategy).await })
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "List.par",
            Strategy::Sequential => "List.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<Vec<T>, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<T, E> Clone for List<T, E> {
    fn clone(&self) -> Self {
        List {
            strategy: self.strategy,
            children: Arc::clone(&self.children),
        }
    }
}

impl<T, E> fmt::Debug for List<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("strategy", &self.strategy)
            .field("children", &self.children.len())
            .finish()
    }
}

impl<T, E> private::Sealed for List<T, E> {}

impl<T, E> Expression for List<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Vec<T>;
    type Error = E;

    fn into_effect(self) -> Effect<Vec<T>, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<T, E> From<List<T, E>> for Effect<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(expression: List<T, E>) -> Self {
        expression.into_effect()
    }
}

impl<T, E> FromIterator<Effect<T, E>> for List<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Collects into a parallel list.
    fn from_iter<I: IntoIterator<Item = Effect<T, E>>>(iter: I) -> Self {
        List::par(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Probe, TestError, Trail};

    #[tokio::test]
    async fn test_seq_failure_stops_later_children() {
        let probe = Probe::new();
        let list = List::seq([
            probe.pure(1),
            probe.fail(TestError::failed("second")),
            probe.pure(3),
        ]);

        assert_eq!(list.run().await, Err(TestError::failed("second")));
        assert_eq!(probe.count(), 2);
    }

    #[tokio::test]
    async fn test_par_runs_all_children_despite_failure() {
        let probe = Probe::new();
        let list = List::par([
            probe.fail(TestError::failed("first")),
            probe.pure(2),
            probe.fail(TestError::failed("third")),
        ]);

        assert_eq!(list.run().await, Err(TestError::failed("first")));
        assert_eq!(probe.count(), 3);
    }

    #[tokio::test]
    async fn test_seq_starts_in_order() {
        let trail = Trail::new();
        let list = List::<_, TestError>::seq([trail.step("a", 1), trail.step("b", 2), trail.step("c", 3)]);

        assert_eq!(list.run().await, Ok(vec![1, 2, 3]));
        assert_eq!(trail.entries(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_head_tail_append() {
        let list = List::<_, TestError>::seq([Effect::pure(1), Effect::pure(2), Effect::pure(3)]);

        let head = list.head().cloned().unwrap();
        assert_eq!(head.run().await, Ok(1));

        let tail = list.tail();
        assert_eq!(tail.strategy(), Strategy::Sequential);
        assert_eq!(tail.run().await, Ok(vec![2, 3]));

        let appended = tail.append(Effect::pure(4));
        assert_eq!(appended.run().await, Ok(vec![2, 3, 4]));
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let list = List::<u8, TestError>::par([]);
        assert!(list.is_empty());
        assert!(list.head().is_none());
        assert!(list.race().is_none());
        assert!(list.tail().is_empty());
        assert_eq!(list.run().await, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_race_adopts_first_finisher() {
        let list = List::<_, TestError>::par([
            crate::testing::delayed(50, "slow"),
            crate::testing::delayed(1, "fast"),
        ]);
        assert_eq!(list.race().unwrap().run().await, Ok("fast"));
    }

    #[test]
    fn test_collect_into_list() {
        let list: List<u8, TestError> = (0..3).map(Effect::pure).collect();
        assert_eq!(list.len(), 3);
        assert!(list.strategy().is_parallel());
    }
}
