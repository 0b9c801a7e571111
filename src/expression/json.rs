//! `JsonArray` and `JsonObject`: collections of heterogeneous values.
//!
//! Children may produce any `Serialize` type. Each value is encoded as a
//! `serde_json::Value` when its child succeeds; an encoding error fails that
//! child with [`Fault::Encode`].

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::effect::rewrite::Rewrite;
use crate::effect::{BoxFuture, Effect, Node};
use crate::fault::Fault;
use crate::retry::RetryPolicy;

use super::object::run_entries;
use super::{private, run_all, Expression, List, Object, Strategy};

fn encoded<V, E>(child: Effect<V, E>) -> Effect<Value, E>
where
    V: Serialize + Send + 'static,
    E: From<Fault> + Send + 'static,
{
    child.try_map(|value| serde_json::to_value(value).map_err(|e| Fault::Encode(e.to_string()).into()))
}

/// Evaluates to a `Value::Array`, elements in construction order.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tributary::{Effect, Expression, Fault, JsonArray};
///
/// # tokio_test::block_on(async {
/// let row = JsonArray::<Fault>::par()
///     .push(Effect::pure(1))
///     .push(Effect::pure("two"))
///     .push(Effect::pure(vec![3.0, 4.5]));
///
/// assert_eq!(row.run().await, Ok(json!([1, "two", [3.0, 4.5]])));
/// # });
/// ```
pub struct JsonArray<E> {
    elements: List<Value, E>,
}

impl<E> JsonArray<E>
where
    E: From<Fault> + Send + 'static,
{
    /// An empty array with the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        JsonArray {
            elements: List::new(strategy, []),
        }
    }

    /// An empty array whose elements are evaluated concurrently.
    pub fn par() -> Self {
        JsonArray::new(Strategy::Parallel)
    }

    /// An empty array whose elements are evaluated in order.
    pub fn seq() -> Self {
        JsonArray::new(Strategy::Sequential)
    }

    /// Append an element producing any serializable value.
    #[must_use]
    pub fn push<V>(self, child: Effect<V, E>) -> Self
    where
        V: Serialize + Send + 'static,
    {
        self.push_value(encoded(child))
    }

    /// Append an element that already produces a `Value`.
    #[must_use]
    pub fn push_value(self, child: Effect<Value, E>) -> Self {
        JsonArray {
            elements: self.elements.append(child),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true when there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.elements.strategy()
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        JsonArray {
            elements: self.elements.rebuild_labelled(self.kind(), rewrite),
        }
    }
}

impl<E> Node<Value, E> for JsonArray<E>
where
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<Value, E>> {
        let elements = self.elements.clone();
        Box::pin(async move {
            let values = run_all(elements.children(), elements.strategy()).await?;
            Ok(Value::Array(values))
        })
    }

    fn kind(&self) -> &'static str {
        match self.elements.strategy() {
            Strategy::Parallel => "JsonArray.par",
            Strategy::Sequential => "JsonArray.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<Value, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

/// Evaluates to a `Value::Object` with one member per key.
///
/// Keys follow the semantics of [`Object`]: unique, replaced in place, and
/// evaluated in insertion order.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tributary::{Effect, Expression, Fault, JsonObject};
///
/// # tokio_test::block_on(async {
/// let user = JsonObject::<Fault>::seq()
///     .with("id", Effect::pure(7u64))
///     .with("name", Effect::pure("ada"))
///     .with("admin", Effect::always_false());
///
/// assert_eq!(
///     user.run().await,
///     Ok(json!({ "id": 7, "name": "ada", "admin": false }))
/// );
/// # });
/// ```
pub struct JsonObject<E> {
    members: Object<Value, E>,
}

impl<E> JsonObject<E>
where
    E: From<Fault> + Send + 'static,
{
    /// An empty object with the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        JsonObject {
            members: Object::new(strategy),
        }
    }

    /// An empty object whose members are evaluated concurrently.
    pub fn par() -> Self {
        JsonObject::new(Strategy::Parallel)
    }

    /// An empty object whose members are evaluated in insertion order.
    pub fn seq() -> Self {
        JsonObject::new(Strategy::Sequential)
    }

    /// Bind `key` to a child producing any serializable value.
    #[must_use]
    pub fn with<V>(self, key: impl Into<String>, child: Effect<V, E>) -> Self
    where
        V: Serialize + Send + 'static,
    {
        self.set(key, child)
    }

    /// A new object with `key` bound to `child`.
    #[must_use]
    pub fn set<V>(&self, key: impl Into<String>, child: Effect<V, E>) -> Self
    where
        V: Serialize + Send + 'static,
    {
        self.set_value(key, encoded(child))
    }

    /// A new object with `key` bound to a child that already produces a `Value`.
    #[must_use]
    pub fn set_value(&self, key: impl Into<String>, child: Effect<Value, E>) -> Self {
        JsonObject {
            members: self.members.set(key, child),
        }
    }

    /// A new object without `key`.
    #[must_use]
    pub fn remove(&self, key: &str) -> Self {
        JsonObject {
            members: self.members.remove(key),
        }
    }

    /// The keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true when there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The evaluation strategy.
    pub fn strategy(&self) -> Strategy {
        self.members.strategy()
    }

    pub(crate) fn rebuild(&self, rewrite: &Rewrite<E>) -> Self {
        JsonObject {
            members: self.members.rebuild_labelled(self.kind(), rewrite),
        }
    }
}

impl<E> Node<Value, E> for JsonObject<E>
where
    E: From<Fault> + Send + 'static,
{
    fn evaluate(&self) -> BoxFuture<'static, Result<Value, E>> {
        let members = self.members.clone();
        Box::pin(async move {
            let values = run_entries(members.entries(), members.strategy()).await?;
            Ok(Value::Object(values.into_iter().collect::<Map<String, Value>>()))
        })
    }

    fn kind(&self) -> &'static str {
        match self.members.strategy() {
            Strategy::Parallel => "JsonObject.par",
            Strategy::Sequential => "JsonObject.seq",
        }
    }

    fn rewrite(&self, rewrite: &Rewrite<E>) -> Option<Effect<Value, E>> {
        Some(rewrite.finish(self.rebuild(rewrite).into_effect()))
    }
}

impl<E> Clone for JsonArray<E> {
    fn clone(&self) -> Self {
        JsonArray {
            elements: self.elements.clone(),
        }
    }
}

impl<E> Clone for JsonObject<E> {
    fn clone(&self) -> Self {
        JsonObject {
            members: self.members.clone(),
        }
    }
}

impl<E> fmt::Debug for JsonArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonArray").field(&self.elements).finish()
    }
}

impl<E> fmt::Debug for JsonObject<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonObject").field(&self.members).finish()
    }
}

impl<E> private::Sealed for JsonArray<E> {}
impl<E> private::Sealed for JsonObject<E> {}

impl<E> Expression for JsonArray<E>
where
    E: From<Fault> + Send + 'static,
{
    type Output = Value;
    type Error = E;

    fn into_effect(self) -> Effect<Value, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<E> Expression for JsonObject<E>
where
    E: From<Fault> + Send + 'static,
{
    type Output = Value;
    type Error = E;

    fn into_effect(self) -> Effect<Value, E> {
        Effect::from_node(self)
    }

    fn retry_each<P>(&self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rebuild(&Rewrite::retry_each(predicate, policy))
    }
}

impl<E> From<JsonArray<E>> for Effect<Value, E>
where
    E: From<Fault> + Send + 'static,
{
    fn from(expression: JsonArray<E>) -> Self {
        expression.into_effect()
    }
}

impl<E> From<JsonObject<E>> for Effect<Value, E>
where
    E: From<Fault> + Send + 'static,
{
    fn from(expression: JsonObject<E>) -> Self {
        expression.into_effect()
    }
}
