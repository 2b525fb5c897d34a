//! Typed notifications and per-kind subscriber lists.
//!
//! An [`EventTarget`] keeps listeners grouped by [`EventKind`]. Dispatching
//! runs the target's listeners and, for bubbling events, those of every
//! ancestor target. Listeners may call [`Event::prevent_default`] on
//! cancelable events; the dispatcher reports whether that happened.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::form::FormData;
use crate::lock;

/// Notification kinds, both consumed (`Change`, `Input`) and emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Change,
    Input,
    Send,
    Success,
    Error,
    Complete,
    LoadStart,
    Load,
    LoadError,
    LoadEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Change,
        EventKind::Input,
        EventKind::Send,
        EventKind::Success,
        EventKind::Error,
        EventKind::Complete,
        EventKind::LoadStart,
        EventKind::Load,
        EventKind::LoadError,
        EventKind::LoadEnd,
    ];

    /// Wire name of the notification.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Change => "change",
            EventKind::Input => "input",
            EventKind::Send => "autocheck:send",
            EventKind::Success => "autocheck:success",
            EventKind::Error => "autocheck:error",
            EventKind::Complete => "autocheck:complete",
            EventKind::LoadStart => "loadstart",
            EventKind::Load => "load",
            EventKind::LoadError => "error",
            EventKind::LoadEnd => "loadend",
        }
    }

    /// Lifecycle mirrors dispatched on the host element rather than the input.
    pub fn is_host_lifecycle(self) -> bool {
        matches!(
            self,
            EventKind::LoadStart | EventKind::Load | EventKind::LoadError | EventKind::LoadEnd
        )
    }
}

/// Payload carried by a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetail {
    None,
    Send { body: FormData },
    Success { warning: Option<String> },
    Error { message: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    detail: EventDetail,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
}

impl Event {
    fn new(kind: EventKind, detail: EventDetail, bubbles: bool, cancelable: bool) -> Self {
        Self {
            kind,
            detail,
            bubbles,
            cancelable,
            default_prevented: false,
        }
    }

    pub fn change() -> Self {
        Self::new(EventKind::Change, EventDetail::None, true, false)
    }

    pub fn input() -> Self {
        Self::new(EventKind::Input, EventDetail::None, true, false)
    }

    pub fn send(body: FormData) -> Self {
        Self::new(EventKind::Send, EventDetail::Send { body }, true, true)
    }

    pub fn success(warning: Option<String>) -> Self {
        Self::new(EventKind::Success, EventDetail::Success { warning }, true, true)
    }

    pub fn error(message: Option<String>) -> Self {
        Self::new(EventKind::Error, EventDetail::Error { message }, true, true)
    }

    pub fn complete() -> Self {
        Self::new(EventKind::Complete, EventDetail::None, true, true)
    }

    /// Non-bubbling, non-cancelable request lifecycle mirror.
    pub fn lifecycle(kind: EventKind) -> Self {
        debug_assert!(kind.is_host_lifecycle(), "{:?} is not a lifecycle kind", kind);
        Self::new(kind, EventDetail::None, false, false)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut EventDetail {
        &mut self.detail
    }

    pub fn into_detail(self) -> EventDetail {
        self.detail
    }

    /// Mutable submission payload of an `autocheck:send` notification.
    pub fn body_mut(&mut self) -> Option<&mut FormData> {
        match &mut self.detail {
            EventDetail::Send { body } => Some(body),
            _ => None,
        }
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Marks the event canceled. Has no effect on non-cancelable events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type Listener = Arc<dyn Fn(&mut Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
struct TargetInner {
    listeners: Mutex<Vec<Registration>>,
    parent: Mutex<Option<Weak<TargetInner>>>,
    next_id: AtomicU64,
}

impl TargetInner {
    fn invoke(&self, event: &mut Event) {
        // Snapshot so listeners can add or remove listeners while running.
        let snapshot: Vec<Listener> = lock(&self.listeners)
            .iter()
            .filter(|registration| registration.kind == event.kind)
            .map(|registration| registration.listener.clone())
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }
}

/// Something notifications can be dispatched on.
#[derive(Clone, Default)]
pub struct EventTarget {
    inner: Arc<TargetInner>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push(Registration {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    /// Returns false if no listener with `id` was registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|registration| registration.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.inner.listeners)
            .iter()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    /// Set the target bubbling events continue to. The parent is held weakly.
    pub fn set_parent(&self, parent: Option<&EventTarget>) {
        *lock(&self.inner.parent) = parent.map(|p| Arc::downgrade(&p.inner));
    }

    pub fn has_parent(&self) -> bool {
        lock(&self.inner.parent)
            .as_ref()
            .is_some_and(|parent| parent.strong_count() > 0)
    }

    /// Dispatch `event`, returning false if a listener canceled it.
    pub fn dispatch(&self, event: &mut Event) -> bool {
        self.inner.invoke(event);

        if event.bubbles {
            let mut next = lock(&self.inner.parent).as_ref().and_then(Weak::upgrade);
            while let Some(target) = next {
                target.invoke(event);
                next = lock(&target.parent).as_ref().and_then(Weak::upgrade);
            }
        }

        !event.default_prevented
    }
}

impl std::fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTarget")
            .field("listeners", &lock(&self.inner.listeners).len())
            .field("has_parent", &self.has_parent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::Send.name(), "autocheck:send");
        assert_eq!(EventKind::Complete.name(), "autocheck:complete");
        assert_eq!(EventKind::LoadError.name(), "error");
        assert!(EventKind::LoadEnd.is_host_lifecycle());
        assert!(!EventKind::Error.is_host_lifecycle());
    }

    #[test]
    fn test_listeners_are_per_kind() {
        let target = EventTarget::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        target.add_event_listener(EventKind::Complete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        target.dispatch(&mut Event::success(None));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        target.dispatch(&mut Event::complete());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prevent_default_only_on_cancelable() {
        let target = EventTarget::new();
        target.add_event_listener(EventKind::Send, |event| event.prevent_default());
        target.add_event_listener(EventKind::LoadStart, |event| event.prevent_default());

        assert!(!target.dispatch(&mut Event::send(FormData::new())));
        assert!(target.dispatch(&mut Event::lifecycle(EventKind::LoadStart)));
    }

    #[test]
    fn test_send_listener_mutates_body() {
        let target = EventTarget::new();
        target.add_event_listener(EventKind::Send, |event| {
            if let Some(body) = event.body_mut() {
                body.append("scope", "signup");
            }
        });

        let mut event = Event::send(FormData::new());
        target.dispatch(&mut event);

        match event.into_detail() {
            EventDetail::Send { body } => assert_eq!(body.get("scope"), Some("signup")),
            other => panic!("Expected send detail, got {:?}", other),
        }
    }

    #[test]
    fn test_bubbling_reaches_parent() {
        let parent = EventTarget::new();
        let child = EventTarget::new();
        child.set_parent(Some(&parent));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        parent.add_event_listener(EventKind::Complete, move |event| {
            lock(&log).push(event.name());
        });
        let log = seen.clone();
        parent.add_event_listener(EventKind::LoadEnd, move |event| {
            lock(&log).push(event.name());
        });

        child.dispatch(&mut Event::complete());
        child.dispatch(&mut Event::lifecycle(EventKind::LoadEnd));

        assert_eq!(*lock(&seen), vec!["autocheck:complete"]);
    }

    #[test]
    fn test_parent_is_weak() {
        let child = EventTarget::new();
        {
            let parent = EventTarget::new();
            child.set_parent(Some(&parent));
            assert!(child.has_parent());
        }
        assert!(!child.has_parent());
        assert!(child.dispatch(&mut Event::complete()));
    }

    #[test]
    fn test_remove_listener() {
        let target = EventTarget::new();
        let id = target.add_event_listener(EventKind::Input, |_| {});
        assert_eq!(target.listener_count(EventKind::Input), 1);
        assert!(target.remove_event_listener(id));
        assert!(!target.remove_event_listener(id));
        assert_eq!(target.listener_count(EventKind::Input), 0);
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let target = EventTarget::new();
        let inner = target.clone();
        target.add_event_listener(EventKind::Input, move |_| {
            inner.add_event_listener(EventKind::Input, |_| {});
        });

        target.dispatch(&mut Event::input());
        assert_eq!(target.listener_count(EventKind::Input), 2);
    }
}
