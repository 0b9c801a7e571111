//! Node types behind the [`Effect`](crate::Effect) constructors and combinators.
//!
//! Each node owns the closures it needs behind an `Arc`, so that running an
//! effect never consumes it and every run gets its own `'static` future.

mod and_then;
mod defer;
mod delay;
mod fail;
mod fallback_to;
mod from_async;
mod from_fn;
mod map;
mod map_err;
mod pure;
mod race;
mod recover;
mod tap;
mod timeout;

pub(crate) use and_then::{AndThen, AndThenOrElse};
pub(crate) use defer::Defer;
pub(crate) use delay::Delay;
pub(crate) use fail::{Fail, FailWith};
pub(crate) use fallback_to::FallbackTo;
pub(crate) use from_async::FromAsync;
pub(crate) use from_fn::FromFn;
pub(crate) use map::{Map, TryMap};
pub(crate) use map_err::MapErr;
pub(crate) use pure::Pure;
pub(crate) use race::Race;
pub(crate) use recover::{Recover, RecoverWith};
pub(crate) use tap::{observe, Tap, TapErr};
pub(crate) use timeout::Timeout;
