//! The text input an auto-check element watches.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::events::{Event, EventKind, EventTarget, ListenerId};
use crate::lock;

/// Identity key for per-input state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputId(Uuid);

impl InputId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct InputInner {
    id: InputId,
    value: Mutex<String>,
    target: EventTarget,
}

/// Shared handle to a text input. Clones refer to the same input.
#[derive(Clone)]
pub struct InputElement {
    inner: Arc<InputInner>,
}

impl InputElement {
    pub fn new() -> Self {
        Self::with_value("")
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(InputInner {
                id: InputId::new(),
                value: Mutex::new(value.into()),
                target: EventTarget::new(),
            }),
        }
    }

    pub fn id(&self) -> InputId {
        self.inner.id
    }

    pub fn value(&self) -> String {
        lock(&self.inner.value).clone()
    }

    /// Set the value without notifying anyone, like assigning `value` in a DOM.
    pub fn set_value(&self, value: impl Into<String>) {
        *lock(&self.inner.value) = value.into();
    }

    /// Set the value and dispatch an `input` event, as typing would.
    pub fn type_value(&self, value: impl Into<String>) {
        self.set_value(value);
        self.dispatch(&mut Event::input());
    }

    pub fn target(&self) -> &EventTarget {
        &self.inner.target
    }

    pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        self.inner.target.add_event_listener(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.target.remove_event_listener(id)
    }

    pub fn dispatch(&self, event: &mut Event) -> bool {
        self.inner.target.dispatch(event)
    }
}

impl Default for InputElement {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InputElement {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for InputElement {}

impl fmt::Debug for InputElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputElement")
            .field("id", &self.inner.id)
            .field("value", &self.value())
            .finish()
    }
}
