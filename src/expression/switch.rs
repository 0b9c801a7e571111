//! `Switch`: match on the outcome of an input effect.
//!
//! The match target is the whole `Result`, so cases can select on failures as
//! well as on values.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;
use crate::retry::RetryPolicy;

use super::{private, Expression};

type Matcher<T, E> = Arc<dyn Fn(&Result<T, E>) -> bool + Send + Sync>;
type Handler<T, U, E> = Arc<dyn Fn(Result<T, E>) -> Effect<U, E> + Send + Sync>;

/// What a [`Switch`] case matches against.
pub enum Pattern<T, E> {
    /// A success equal to the value.
    Equals(T),
    /// A success equal to any of the values.
    OneOf(Vec<T>),
    /// Any outcome accepted by the function.
    Matches(Matcher<T, E>),
}

impl<T, E> Pattern<T, E>
where
    T: PartialEq,
{
    /// A pattern from an arbitrary predicate over the outcome.
    pub fn matching<F>(f: F) -> Self
    where
        F: Fn(&Result<T, E>) -> bool + Send + Sync + 'static,
    {
        Pattern::Matches(Arc::new(f))
    }

    /// Returns true when `outcome` matches.
    pub fn matches(&self, outcome: &Result<T, E>) -> bool {
        match self {
            Pattern::Equals(expected) => matches!(outcome, Ok(value) if value == expected),
            Pattern::OneOf(candidates) => {
                matches!(outcome, Ok(value) if candidates.contains(value))
            }
            Pattern::Matches(matcher) => matcher(outcome),
        }
    }
}

impl<T: Clone, E> Clone for Pattern<T, E> {
    fn clone(&self) -> Self {
        match self {
            Pattern::Equals(value) => Pattern::Equals(value.clone()),
            Pattern::OneOf(values) => Pattern::OneOf(values.clone()),
            Pattern::Matches(matcher) => Pattern::Matches(Arc::clone(matcher)),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Pattern<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Pattern::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Pattern::Matches(_) => f.write_str("Matches(..)"),
        }
    }
}

struct Case<T, U, E> {
    pattern: Arc<Pattern<T, E>>,
    handler: Handler<T, U, E>,
}

/// Evaluate an input effect, then hand its outcome to the first case whose
/// pattern matches, or to `otherwise`.
///
/// Cases are tested in construction order. Exactly one handler runs per
/// evaluation; the others are never called.
///
/// # Example
///
/// ```rust
/// use tributary::{Effect, Expression, Fault, Switch};
///
/// # tokio_test::block_on(async {
/// let status = Effect::<u16, Fault>::pure(404);
///
/// let message = Switch::on(status)
///     .when_eq(200, |_| Effect::pure("ok"))
///     .when_in([404, 410], |_| Effect::pure("gone"))
///     .when_err(|_| true, |_| Effect::pure("unreachable"))
///     .otherwise(|_| Effect::pure("unexpected"));
///
/// assert_eq!(message.run().await, Ok("gone"));
/// # });
/// ```
pub struct Switch<T, U, E> {
    input: Effect<T, E>,
    cases: Arc<[Case<T, U, E>]>,
    otherwise: Handler<T, U, E>,
}

/// Collects the cases of a [`Switch`]. Finished by
/// [`otherwise`](SwitchBuilder::otherwise).
pub struct SwitchBuilder<T, U, E> {
    input: Effect<T, E>,
    cases: Vec<Case<T, U, E>>,
}

impl<T, U, E> SwitchBuilder<T, U, E>
where
    T: PartialEq + Send + Sync + 'static,
    U: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    /// Add a case.
    pub fn case<H>(mut self, pattern: Pattern<T, E>, handler: H) -> Self
    where
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        self.cases.push(Case {
            pattern: Arc::new(pattern),
            handler: Arc::new(handler),
        });
        self
    }

    /// Match a success equal to `value`.
    pub fn when_eq<H>(self, value: T, handler: H) -> Self
    where
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        self.case(Pattern::Equals(value), handler)
    }

    /// Match a success equal to any of `values`.
    pub fn when_in<I, H>(self, values: I, handler: H) -> Self
    where
        I: IntoIterator<Item = T>,
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        self.case(Pattern::OneOf(values.into_iter().collect()), handler)
    }

    /// Match any outcome accepted by `matcher`.
    pub fn when<M, H>(self, matcher: M, handler: H) -> Self
    where
        M: Fn(&Result<T, E>) -> bool + Send + Sync + 'static,
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        self.case(Pattern::matching(matcher), handler)
    }

    /// Match a failure accepted by `matcher`.
    pub fn when_err<M, H>(self, matcher: M, handler: H) -> Self
    where
        M: Fn(&E) -> bool + Send + Sync + 'static,
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        self.when(
            move |outcome: &Result<T, E>| outcome.as_ref().is_err_and(|e| matcher(e)),
            handler,
        )
    }

    /// Finish with the handler used when no case matches.
    pub fn otherwise<H>(self, handler: H) -> Switch<T, U, E>
    where
        H: Fn(Result<T, E>) -> Effect<U, E> + Send + Sync + 'static,
    {
        Switch {
            input: self.input,
            cases: self.cases.into(),
            otherwise: Arc::new(handler),
        }
    }
}

impl<T, U, E> Switch<T, U, E>
where
    T: PartialEq + Send + Sync + 'static,
    U: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    /// Start a `Switch` over the outcome of `input`.
    pub fn on(input: Effect<T, E>) -> SwitchBuilder<T, U, E> {
        SwitchBuilder {
            input,
            cases: Vec::new(),
        }
    }

    /// The effect whose outcome is matched.
    pub fn input(&self) -> &Effect<T, E> {
        &self.input
    }

    /// Number of cases, not counting `otherwise`.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true when only the `otherwise` handler exists.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        let cases = self
            .cases
            .iter()
            .enumerate()
            .map(|(i, case)| Case {
                pattern: Arc::clone(&case.pattern),
                handler: rewrite_handler(rewrite.child(format!("Switch.case[{}]", i)), &case.handler),
            })
            .collect();
        Switch {
            input: rewrite.child("Switch.on").apply(&self.input),
            cases,
            otherwise: rewrite_handler(rewrite.child("Switch.otherwise"), &self.otherwise),
        }
    }
}

fn rewrite_handler<T, U, E>(rewrite: Rewrite<E>, handler: &Handler<T, U, E>) -> Handler<T, U, E>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
{
    let handler = Arc::clone(handler);
    Arc::new(move |outcome: Result<T, E>| rewrite.apply(&handler(outcome)))
}

impl<T, U, E> Node<U, E> for Switch<T, U, E>
where
    T: PartialEq + Send + Sync + 'static,
    U: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<U, E>> {
        let input = self.input.clone();
        let cases = Arc::clone(&self.cases);
        let otherwise = Arc::clone(&self.otherwise);
        Box::pin(async move {
            let outcome = input.run().await;
            let next = std::panic::catch_unwind(AssertUnwindSafe(move || {
                let handler = cases
                    .iter()
                    .find(|case| case.pattern.matches(&outcome))
                    .map_or(&otherwise, |case| &case.handler);
                handler(outcome)
            }))
            .map_err(|payload| E::from(Fault::from_panic(payload)))?;
            next.run().await
        })
    }

    fn kind(&self) -> &'static str {
        "Switch"
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<U, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<T, U, E> Clone for Switch<T, U, E> {
    fn clone(&self) -> Self {
        Switch {
            input: self.input.clone(),
            cases: Arc::clone(&self.cases),
            otherwise: Arc::clone(&self.otherwise),
        }
    }
}

impl<T, U, E> fmt::Debug for Switch<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("input", &self.input)
            .field("cases", &self.cases.len())
            .finish_non_exhaustive()
    }
}

impl<T, U, E> fmt::Debug for SwitchBuilder<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchBuilder")
            .field("input", &self.input)
            .field("cases", &self.cases.len())
            .finish()
    }
}

impl<T, U, E> private::Sealed for Switch<T, U, E> {}

impl<T, U, E> Expression for Switch<T, U, E>
where
    T: PartialEq + Send + Sync + 'static,
    U: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    type Output = U;
    type Error = E;

    fn into_effect(self) -> Effect<U, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<T, U, E> From<Switch<T, U, E>> for Effect<U, E>
where
    T: PartialEq + Send + Sync + 'static,
    U: Send + 'static,
    E: From<Fault> + Send + 'static,
{
    fn from(expression: Switch<T, U, E>) -> Self {
        expression.into_effect()
    }
}
