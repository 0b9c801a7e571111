//! `Object`: children addressed by key.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::retry::RetryPolicy;

use super::{private, Expression, Strategy};

/// Evaluates to a map from each key to its child's value.
///
/// Keys are unique: [`set`](Object::set) replaces an existing entry in
/// place. Evaluation follows insertion order: a sequential object runs its
/// entries in the order they were first inserted, and a parallel one reports
/// the failure of the earliest inserted failing entry.
///
/// # Example
///
/// ```rust
/// use tributary::{Effect, Expression, Fault, Object};
///
/// # tokio_test::block_on(async {
/// let order = Object::<u32, Fault>::par()
///     .with("items", Effect::pure(3))
///     .with("total", Effect::pure(42));
///
/// let values = order.run().await.unwrap();
/// assert_eq!(values["items"], 3);
/// assert_eq!(values["total"], 42);
/// # });
/// ```
pub struct Object<T, E> {
    strategy: Strategy,
    entries: Arc<[(String, Effect<T, E>)]>,
}

impl<T, E> Object<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// An empty object with the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Object {
            strategy,
            entries: Vec::new().into(),
        }
    }

    /// An empty object whose entries run concurrently.
    pub fn par() -> Self {
        Object::new(Strategy::Parallel)
    }

    /// An empty object whose entries run in insertion order.
    pub fn seq() -> Self {
        Object::new(Strategy::Sequential)
    }

    /// Builder form of [`set`](Object::set).
    #[must_use]
    pub fn with(self, key: impl Into<String>, child: Effect<T, E>) -> Self {
        self.set(key, child)
    }

    /// A new object with `key` bound to `child`, replacing any previous
    /// binding while keeping its position. Other entries are shared.
    #[must_use]
    pub fn set(&self, key: impl Into<String>, child: Effect<T, E>) -> Self {
        let key = key.into();
        let mut entries: Vec<_> = self.entries.to_vec();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = child,
            None => entries.push((key, child)),
        }
        Object {
            strategy: self.strategy,
            entries: entries.into(),
        }
    }

    /// A new object without `key`.
    #[must_use]
    pub fn remove(&self, key: &str) -> Self {
        Object {
            strategy: self.strategy,
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    /// The child bound to `key`.
    pub fn get(&self, key: &str) -> Option<&Effect<T, E>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, child)| child)
    }

    /// The keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub(crate) fn entries(&self) -> &[(String, Effect<T, E>)] {
        &self.entries
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        self.rebuild_labelled(self.kind(), rewrite)
    }

    /// Rebuild with children labelled `kind[..]`.
    pub(crate) fn rebuild_labelled(&self, kind: &str, rewrite: &Rewrite<E>) -> Self {
        Object {
            strategy: self.strategy,
            entries: self
                .entries
                .iter()
                .map(|(key, child)| {
                    let label = format!("{}[{}]", kind, key);
                    (key.clone(), rewrite.child(label).apply(child))
                })
                .collect(),
        }
    }
}

/// Entries in insertion order, evaluated with `strategy`.
pub(crate) async fn run_entries<T, E>(
    entries: &[(String, Effect<T, E>)],
    strategy: Strategy,
) -> Result<Vec<(String, T)>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    match strategy {
        Strategy::Parallel => {
            let outcomes = join_all(entries.iter().map(|(_, child)| child.run())).await;
            entries
                .iter()
                .zip(outcomes)
                .map(|((key, _), outcome)| outcome.map(|value| (key.clone(), value)))
                .collect()
        }
        Strategy::Sequential => {
            let mut values = Vec::with_capacity(entries.len());
            for (key, child) in entries {
                values.push((key.clone(), child.run().await?));
            }
            Ok(values)
        }
    }
}

impl<T, E> Node<BTreeMap<String, T>, E> for Object<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<BTreeMap<String, T>, E>> {
        let entries = Arc::clone(&self.entries);
        let strategy = self.strategy;
        Box::pin(async move {
            let values = run_entries(&entries, strategy).await?;
            Ok(values.into_iter().collect())
        })
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "Object.par",
            Strategy::Sequential => "Object.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<BTreeMap<String, T>, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<T, E> Clone for Object<T, E> {
    fn clone(&self) -> Self {
        Object {
            strategy: self.strategy,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T, E> fmt::Debug for Object<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("strategy", &self.strategy)
            .field("keys", &self.entries.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl<T, E> private::Sealed for Object<T, E> {}

impl<T, E> Expression for Object<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = BTreeMap<String, T>;
    type Error = E;

    fn into_effect(self) -> Effect<BTreeMap<String, T>, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<T, E> From<Object<T, E>> for Effect<BTreeMap<String, T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(expression: Object<T, E>) -> Self {
        expression.into_effect()
    }
}
