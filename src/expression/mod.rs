//! Composite effects that reduce a fixed set of children into one result.
//!
//! Every expression owns its children and a [`Strategy`]:
//!
//! | Strategy | Children start | Completes | On failure |
//! |----------|----------------|-----------|------------|
//! | [`Strategy::Parallel`] | all at once | when **every** child has finished | fails after all finish; the lowest-index (first-inserted) failure is reported |
//! | [`Strategy::Sequential`] | one after another | at the first deciding child | the failing child short-circuits; later children never start |
//!
//! Expressions are immutable. Operations such as
//! [`retry_each`](Expression::retry_each) or [`List::append`] return a new
//! expression that shares untouched children with the original.
//!
//! Parallel only *starts* children together. Whether they overlap depends on
//! the [`Scheduler`](crate::Scheduler) each leaf was built with: inline
//! leaves that never suspend still run one after another.
//!
//! # Example
//!
//! ```rust
//! use tributary::{AllOf, Effect, Expression, Fault, List};
//!
//! # tokio_test::block_on(async {
//! let ready = AllOf::<Fault>::seq([Effect::always_true(), Effect::always_false()]);
//! assert_eq!(ready.run().await, Ok(false));
//!
//! let sizes = List::<_, Fault>::par([Effect::pure(3), Effect::pure(1), Effect::pure(2)]);
//! assert_eq!(sizes.run().await, Ok(vec![3, 1, 2]));
//! # });
//! ```

mod boolean;
mod cond;
mod json;
mod list;
mod object;
mod switch;
mod tuple;

pub use boolean::{AllOf, AnyOf};
pub use cond::{Cond, CondBuilder, IfElse};
pub use json::{JsonArray, JsonObject};
pub use list::List;
pub use object::Object;
pub use switch::{Pattern, Switch, SwitchBuilder};
pub use tuple::{Pair, Triple};

use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::effect::rewrite::Supplier;
use crate::effect::{BoxFuture, Effect};
use crate::fault::Fault;
use crate::retry::RetryPolicy;

/// How an expression evaluates its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Start every child at once and wait for all of them.
    #[default]
    Parallel,
    /// Start children one at a time, stopping at the deciding one.
    Sequential,
}

impl Strategy {
    /// Returns true for [`Strategy::Parallel`].
    pub fn is_parallel(&self) -> bool {
        matches!(self, Strategy::Parallel)
    }
}

mod private {
    pub trait Sealed {}
}

/// A composite effect.
///
/// The set of expression types is closed; see the module docs for the list.
pub trait Expression: private::Sealed + Clone + Send + Sync + 'static {
    /// The value the expression reduces to.
    type Output: Send + 'static;
    /// The failure shared by the expression and its children.
    type Error: Send + 'static;

    /// This expression as a plain effect.
    fn into_effect(self) -> Effect<Self::Output, Self::Error>;

    /// A structurally identical expression whose every leaf is retried under
    /// `policy` while `predicate` accepts its error.
    ///
    /// Nested expressions are rebuilt recursively; no expression node is
    /// itself retried.
    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&Self::Error) -> bool + Send + Sync + 'static;

    /// Evaluate the expression.
    fn run(&self) -> BoxFuture<'static, Result<Self::Output, Self::Error>> {
        self.clone().into_effect().run()
    }
}

/// Run every child, in order or all at once, collecting values in
/// construction order.
pub(crate) async fn run_all<T, E>(children: &[Effect<T, E>], strategy: Strategy) -> Result<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    match strategy {
        Strategy::Parallel => join_all(children.iter().map(Effect::run))
            .await
            .into_iter()
            .collect(),
        Strategy::Sequential => {
            let mut values = Vec::with_capacity(children.len());
            for child in children {
                values.push(child.run().await?);
            }
            Ok(values)
        }
    }
}

/// Invoke a branch supplier, capturing a panic as a failure.
pub(crate) fn build<T, E>(supplier: &Supplier<T, E>) -> Result<Effect<T, E>, E>
where
    E: From<Fault>,
{
    std::panic::catch_unwind(AssertUnwindSafe(|| supplier()))
        .map_err(|payload| Fault::from_panic(payload).into())
}

/// `Kind[index]`, the label of a positional child.
pub(crate) fn indexed(kind: &str, index: usize) -> String {
    format!("{}[{}]", kind, index)
}
