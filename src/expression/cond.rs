//! `Cond` and `IfElse`: predicate-selected branches.
//!
//! Branches are suppliers, not effects. A branch is only built, and so only
//! run, once the predicates have selected it.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use crate::effect::rewrite::{Rewrite, Supplier};
use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;
use crate::retry::RetryPolicy;

use super::{build, private, Expression, Strategy};

/// An ordered list of `(predicate, branch)` clauses and a default branch.
///
/// The first clause (in construction order) whose predicate is true has its
/// branch evaluated; when none is, the `otherwise` branch runs. A failing
/// predicate fails the whole expression.
///
/// - Parallel: every predicate runs; the selection happens once all have
///   resolved.
/// - Sequential: predicates run one at a time and evaluation stops at the
///   first true one.
///
/// # Example
///
/// ```rust
/// use tributary::{Cond, Effect, Expression, Fault};
///
/// # tokio_test::block_on(async {
/// let tier = Cond::<&str, Fault>::seq()
///     .when(Effect::always_false(), || Effect::pure("gold"))
///     .when(Effect::always_true(), || Effect::pure("silver"))
///     .otherwise(|| Effect::pure("bronze"));
///
/// assert_eq!(tier.run().await, Ok("silver"));
/// # });
/// ```
pub struct Cond<T, E> {
    strategy: Strategy,
    clauses: Arc<[Clause<T, E>]>,
    otherwise: Supplier<T, E>,
}

struct Clause<T, E> {
    predicate: Effect<bool, E>,
    branch: Supplier<T, E>,
}

impl<T, E> Clone for Clause<T, E> {
    fn clone(&self) -> Self {
        Clause {
            predicate: self.predicate.clone(),
            branch: Arc::clone(&self.branch),
        }
    }
}

/// Collects the clauses of a [`Cond`]. Finished by
/// [`otherwise`](CondBuilder::otherwise), so a `Cond` always has a default.
pub struct CondBuilder<T, E> {
    strategy: Strategy,
    clauses: Vec<Clause<T, E>>,
}

impl<T, E> Cond<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    /// Start a `Cond` with the given strategy.
    pub fn builder(strategy: Strategy) -> CondBuilder<T, E> {
        CondBuilder {
            strategy,
            clauses: Vec::new(),
        }
    }

    /// Start a `Cond` whose predicates all run concurrently.
    pub fn par() -> CondBuilder<T, E> {
        Cond::builder(Strategy::Parallel)
    }

    /// Start a `Cond` whose predicates run in order.
    pub fn seq() -> CondBuilder<T, E> {
        Cond::builder(Strategy::Sequential)
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of clauses, not counting `otherwise`.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns true when only the `otherwise` branch exists.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        let kind = self.kind();
        Cond {
            strategy: self.strategy,
            clauses: self
                .clauses
                .iter()
                .enumerate()
                .map(|(i, clause)| Clause {
                    predicate: rewrite
                        .child(format!("{}.when[{}]", kind, i))
                        .apply(&clause.predicate),
                    branch: rewrite.supplier(format!("{}.then[{}]", kind, i), &clause.branch),
                })
                .collect(),
            otherwise: rewrite.supplier(format!("{}.otherwise", kind), &self.otherwise),
        }
    }
}

impl<T, E> CondBuilder<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    /// Add a clause: when `predicate` is true, evaluate what `branch` builds.
    pub fn when<F>(mut self, predicate: Effect<bool, E>, branch: F) -> Self
    where
        F: Fn() -> Effect<T, E> + Send + Sync + 'static,
    {
        self.clauses.push(Clause {
            predicate,
            branch: Arc::new(branch),
        });
        self
    }

    /// Finish with the branch used when no predicate is true.
    pub fn otherwise<F>(self, branch: F) -> Cond<T, E>
    where
        F: Fn() -> Effect<T, E> + Send + Sync + 'static,
    {
        Cond {
            strategy: self.strategy,
            clauses: self.clauses.into(),
            otherwise: Arc::new(branch),
        }
    }
}

impl<T, E> Node<T, E> for Cond<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let strategy = self.strategy;
        let clauses = Arc::clone(&self.clauses);
        let otherwise = Arc::clone(&self.otherwise);
        Box::pin(async move {
            let selected = match strategy {
                Strategy::Parallel => {
                    let decisions: Vec<bool> =
                        join_all(clauses.iter().map(|clause| clause.predicate.run()))
                            .await
                            .into_iter()
                            .collect::<Result<_, E>>()?;
                    decisions.iter().position(|chosen| *chosen)
                }
                Strategy::Sequential => {
                    let mut selected = None;
                    for (i, clause) in clauses.iter().enumerate() {
                        if clause.predicate.run().await? {
                            selected = Some(i);
                            break;
                        }
                    }
                    selected
                }
            };
            let branch = match selected {
                Some(i) => &clauses[i].branch,
                None => &otherwise,
            };
            build(branch)?.run().await
        })
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Parallel => "Cond.par",
            Strategy::Sequential => "Cond.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<T, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

/// One predicate, two branches. Only the selected branch is ever built.
///
/// # Example
///
/// ```rust
/// use tributary::{Effect, Expression, Fault, IfElse};
///
/// # tokio_test::block_on(async {
/// let greeting = IfElse::<_, Fault>::new(
///     Effect::always_true(),
///     || Effect::pure("hello"),
///     || Effect::pure("goodbye"),
/// );
/// assert_eq!(greeting.run().await, Ok("hello"));
/// # });
/// ```
pub struct IfElse<T, E> {
    predicate: Effect<bool, E>,
    then: Supplier<T, E>,
    otherwise: Supplier<T, E>,
}

impl<T, E> IfElse<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    /// Evaluate `then` when `predicate` is true, `otherwise` when it is false.
    pub fn new<A, B>(predicate: Effect<bool, E>, then: A, otherwise: B) -> Self
    where
        A: Fn() -> Effect<T, E> + Send + Sync + 'static,
        B: Fn() -> Effect<T, E> + Send + Sync + 'static,
    {
        IfElse {
            predicate,
            then: Arc::new(then),
            otherwise: Arc::new(otherwise),
        }
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        IfElse {
            predicate: rewrite.child("IfElse.if").apply(&self.predicate),
            then: rewrite.supplier("IfElse.then", &self.then),
            otherwise: rewrite.supplier("IfElse.else", &self.otherwise),
        }
    }
}

impl<T, E> Node<T, E> for IfElse<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<T, E>> {
        let predicate = self.predicate.clone();
        let then = Arc::clone(&self.then);
        let otherwise = Arc::clone(&self.otherwise);
        Box::pin(async move {
            let branch = if predicate.run().await? { &then } else { &otherwise };
            build(branch)?.run().await
        })
    }

    fn kind(&self) -> &'static str {
        "IfElse"
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<T, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<T, E> Clone for Cond<T, E> {
    fn clone(&self) -> Self {
        Cond {
            strategy: self.strategy,
            clauses: Arc::clone(&self.clauses),
            otherwise: Arc::clone(&self.otherwise),
        }
    }
}

impl<T, E> Clone for IfElse<T, E> {
    fn clone(&self) -> Self {
        IfElse {
            predicate: self.predicate.clone(),
            then: Arc::clone(&self.then),
            otherwise: Arc::clone(&self.otherwise),
        }
    }
}

impl<T, E> fmt::Debug for Cond<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cond")
            .field("strategy", &self.strategy)
            .field("clauses", &self.clauses.len())
            .finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for CondBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondBuilder")
            .field("strategy", &self.strategy)
            .field("clauses", &self.clauses.len())
            .finish()
    }
}

impl<T, E> fmt::Debug for IfElse<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElse")
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

impl<T, E> private::Sealed for Cond<T, E> {}
impl<T, E> private::Sealed for IfElse<T, E> {}

impl<T, E> Expression for Cond<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_effect(self) -> Effect<T, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<T, E> Expression for IfElse<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_effect(self) -> Effect<T, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<T, E> From<Cond<T, E>> for Effect<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn from(expression: Cond<T, E>) -> Self {
        expression.into_effect()
    }
}

impl<T, E> From<IfElse<T, E>> for Effect<T, E>
where
    T: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn from(expression: IfElse<T, E>) -> Self {
        expression.into_effect()
    }
}
