//! # Tributary
//!
//! > *Many small streams, one river.*
//!
//! A Rust library for composing asynchronous effects into trees that reduce
//! to a single result.
//!
//! ## Building blocks
//!
//! - [`Effect<T, E>`]: a lazy, re-runnable asynchronous computation that
//!   completes with `Ok(T)` or `Err(E)`. Leaves run caller code on an explicit
//!   [`Scheduler`]; combinators transform, chain, recover, time out and race.
//! - [`Expression`]s: composite effects that own a fixed set of children and
//!   reduce them under a [`Strategy`], parallel or sequential. Boolean
//!   ([`AllOf`], [`AnyOf`]), conditional ([`Cond`], [`IfElse`], [`Switch`]),
//!   tuple ([`Pair`], [`Triple`]), list ([`List`], [`JsonArray`]) and keyed
//!   ([`Object`], [`JsonObject`]) reductions are provided.
//! - [`RetryPolicy`]: a pure function from [`RetryStatus`] to the next delay,
//!   with the usual shapes (constant, exponential, jittered, ...) and
//!   combinators to cap and compose them. [`Effect::retry`] and
//!   [`Effect::repeat`] drive an effect under a policy.
//!
//! ## Quick Example
//!
//! ```rust
//! use tributary::{AllOf, Cond, Effect, Expression, Fault, RetryPolicy, Scheduler};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let healthy = AllOf::<Fault>::par([Effect::always_true(), Effect::always_true()]);
//!
//! let reply = Cond::seq()
//!     .when(healthy.into_effect(), || Effect::pure("serving"))
//!     .otherwise(|| Effect::pure("degraded"));
//!
//! let policy = RetryPolicy::exponential_backoff(Duration::from_millis(10))
//!     .append(RetryPolicy::limit_retries(3));
//! let fetch = Effect::<_, Fault>::from_fn(&Scheduler::Inline, || Ok(200u16))
//!     .retry(|fault| fault.is_timeout(), policy);
//!
//! assert_eq!(reply.run().await, Ok("serving"));
//! assert_eq!(fetch.run().await, Ok(200));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod effect;
pub mod expression;
pub mod fault;
pub mod retry;
pub mod scheduler;
pub mod testing;

// Re-exports
pub use effect::instrument;
pub use effect::{bracket, BoxFuture, Effect};
pub use expression::{
    AllOf, AnyOf, Cond, CondBuilder, Expression, IfElse, JsonArray, JsonObject, List, Object,
    Pair, Pattern, Strategy, Switch, SwitchBuilder, Triple,
};
pub use fault::Fault;
pub use retry::{Jitter, RetryPolicy, RetryStatus};
pub use scheduler::Scheduler;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::effect::{bracket, Effect};
    pub use crate::expression::{
        AllOf, AnyOf, Cond, Expression, IfElse, JsonArray, JsonObject, List, Object, Pair,
        Pattern, Strategy, Switch, Triple,
    };
    pub use crate::fault::Fault;
    pub use crate::retry::{Jitter, RetryPolicy, RetryStatus};
    pub use crate::scheduler::Scheduler;
}
