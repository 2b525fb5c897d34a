use std::sync::{Arc, Mutex};
use std::time::Duration;

use auto_check::{
    AUTO_CHECK_TAG, AutoCheckElement, AutoCheckFactory, ElementRegistry, EventDetail, EventKind,
    InputElement, define_auto_check,
};

use super::mocks::ScriptedTransport;

pub const BASE_URL: &str = "https://example.com/signup";
pub const SRC: &str = "/validate";
pub const RESOLVED_SRC: &str = "https://example.com/validate";
pub const TOKEN: &str = "tok1";

/// Notifications observed on an element's host, in dispatch order.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<(EventKind, EventDetail)>>>,
}

impl EventLog {
    /// Record every emitted notification reaching `element`'s host.
    pub fn attach(element: &AutoCheckElement) -> Self {
        let log = Self::default();
        for kind in EventKind::ALL {
            if matches!(kind, EventKind::Change | EventKind::Input) {
                continue;
            }
            let entries = log.entries.clone();
            element.add_event_listener(kind, move |event| {
                entries
                    .lock()
                    .unwrap()
                    .push((event.kind(), event.detail().clone()));
            });
        }
        log
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _)| kind.name())
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn details(&self, kind: EventKind) -> Vec<EventDetail> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, detail)| detail.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Full lifecycle of a check that reached the network and succeeded.
pub const SUCCESS_SEQUENCE: [&str; 6] = [
    "autocheck:send",
    "loadstart",
    "load",
    "autocheck:success",
    "loadend",
    "autocheck:complete",
];

/// Full lifecycle of a check that reached the network and failed.
pub const ERROR_SEQUENCE: [&str; 6] = [
    "autocheck:send",
    "loadstart",
    "error",
    "autocheck:error",
    "loadend",
    "autocheck:complete",
];

/// A configured, connected element backed by `transport`.
pub struct Fixture {
    pub element: AutoCheckElement,
    pub input: InputElement,
    pub log: EventLog,
    pub transport: Arc<ScriptedTransport>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(300))
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        let transport = ScriptedTransport::new();
        let registry = ElementRegistry::new();
        define_auto_check(
            &registry,
            AutoCheckFactory::new(transport.clone()).with_debounce(debounce),
        );

        let element = registry.create(AUTO_CHECK_TAG).unwrap();
        element.set_base_url(BASE_URL).unwrap();
        element.set_src(SRC);
        element.set_csrf(TOKEN);

        let input = InputElement::new();
        element.attach(input.clone());
        let log = EventLog::attach(&element);

        Self {
            element,
            input,
            log,
            transport,
        }
    }

    /// Type `value`, then let the debounce window elapse and the check finish.
    pub async fn type_and_settle(&self, value: &str) {
        self.input.type_value(value);
        self.element.settled().await;
    }
}
