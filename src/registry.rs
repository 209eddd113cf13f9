//! Ordered handler registrations.
//!
//! A handler pairs a predicate with an action. Handlers are appended during
//! setup and frozen into a shared slice when the engine starts; the dispatch
//! loop then reads that slice for every event.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a registered handler.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(Uuid);

impl HandlerId {
    /// Create a new random handler id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decides whether a handler runs for an event. Must be fast and side-effect free.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Work performed for a matching event, on its own thread.
pub type Action<E> = Arc<dyn Fn(E) + Send + Sync>;

/// An immutable (predicate, action) pair.
pub struct Handler<E> {
    id: HandlerId,
    name: Option<String>,
    predicate: Predicate<E>,
    action: Action<E>,
}

impl<E> Handler<E> {
    /// Identifier assigned at registration.
    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    /// Name given to `register_named`, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Evaluates the predicate.
    pub fn matches(&self, event: &E) -> bool {
        (self.predicate)(event)
    }

    /// Shared handle to the action, for running it off the dispatch thread.
    #[must_use]
    pub fn action(&self) -> Action<E> {
        Arc::clone(&self.action)
    }

    /// Name for logs and thread names: the registered name, or the id.
    #[must_use]
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

impl<E> fmt::Debug for Handler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Append-only list of handlers, kept in registration order.
pub struct HandlerRegistry<E> {
    handlers: Vec<Handler<E>>,
}

impl<E> HandlerRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Appends a handler.
    pub fn register<P, A>(&mut self, predicate: P, action: A) -> HandlerId
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        A: Fn(E) + Send + Sync + 'static,
    {
        self.push(None, Arc::new(predicate), Arc::new(action))
    }

    /// Appends a handler with a name used in logs.
    pub fn register_named<P, A>(&mut self, name: impl Into<String>, predicate: P, action: A) -> HandlerId
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        A: Fn(E) + Send + Sync + 'static,
    {
        self.push(Some(name.into()), Arc::new(predicate), Arc::new(action))
    }

    fn push(&mut self, name: Option<String>, predicate: Predicate<E>, action: Action<E>) -> HandlerId {
        let id = HandlerId::new();
        self.handlers.push(Handler {
            id,
            name,
            predicate,
            action,
        });
        id
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Freezes the current registrations for dispatch.
    #[must_use]
    pub fn snapshot(self) -> Arc<[Handler<E>]> {
        self.handlers.into()
    }
}

impl<E> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.handlers).finish()
    }
}
