//! The `<auto-check>` host element.
//!
//! Holds the `src` and `csrf` attributes, watches one attached input and
//! runs debounced checks through its [`ValidationController`].

use reqwest::Url;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::ElementConfig;
use crate::controller::{CheckOutcome, CheckState, FingerprintStore, ValidationController};
use crate::coordinator::RequestCoordinator;
use crate::debounce::Debouncer;
use crate::error::{AutoCheckError, ConfigError, ConfigResult, Result};
use crate::events::{Event, EventKind, EventTarget, ListenerId};
use crate::input::InputElement;
use crate::lock;

struct Connection {
    input: InputElement,
    listeners: [ListenerId; 2],
}

struct ElementInner {
    host: EventTarget,
    attributes: Mutex<HashMap<String, String>>,
    base_url: Mutex<Option<Url>>,
    connection: Mutex<Option<Connection>>,
    controller: ValidationController,
    debouncer: Debouncer,
    running: watch::Sender<usize>,
    last_outcome: Mutex<Option<CheckOutcome>>,
}

impl ElementInner {
    fn src(&self) -> String {
        let src = match lock(&self.attributes).get("src") {
            Some(src) if !src.is_empty() => src.clone(),
            _ => return String::new(),
        };
        resolve(lock(&self.base_url).as_ref(), &src)
    }

    fn csrf(&self) -> String {
        lock(&self.attributes).get("csrf").cloned().unwrap_or_default()
    }

    fn input(&self) -> Option<InputElement> {
        lock(&self.connection).as_ref().map(|c| c.input.clone())
    }

    async fn check(&self) -> Result<CheckOutcome> {
        let src = self.src();
        if src.is_empty() {
            return Err(ConfigError::MissingSrc.into());
        }
        let csrf = self.csrf();
        if csrf.is_empty() {
            return Err(ConfigError::MissingCsrf.into());
        }
        let input = self.input().ok_or(AutoCheckError::NotConnected)?;

        let outcome = self
            .controller
            .check(&input, &self.host, &src, &csrf)
            .await?;
        if outcome != CheckOutcome::Superseded {
            *lock(&self.last_outcome) = Some(outcome.clone());
        }
        Ok(outcome)
    }

    /// Debounced entry point: runs the check on its own task.
    fn schedule_check(self: Arc<Self>) {
        self.running.send_modify(|running| *running += 1);
        tokio::spawn(async move {
            let _running = RunningGuard(&self.running);
            if let Err(error) = self.check().await {
                tracing::error!(%error, "auto-check failed");
            }
        });
    }
}

/// Counts a debounced check as finished however its task ends.
struct RunningGuard<'a>(&'a watch::Sender<usize>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|running| *running = running.saturating_sub(1));
    }
}

/// Resolve `src` against `base`, returning `src` unchanged when that fails.
fn resolve(base: Option<&Url>, src: &str) -> String {
    let resolved = match base {
        Some(base) => base.join(src),
        None => Url::parse(src),
    };
    match resolved {
        Ok(url) => url.into(),
        Err(error) => {
            tracing::debug!(src, %error, "could not resolve src; using it as-is");
            src.to_string()
        }
    }
}

/// Handle to an auto-check element. Clones share the same element.
#[derive(Clone)]
pub struct AutoCheckElement {
    inner: Arc<ElementInner>,
}

impl AutoCheckElement {
    pub fn new(
        coordinator: RequestCoordinator,
        fingerprints: FingerprintStore,
        debounce: Duration,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ElementInner>| {
            let weak = weak.clone();
            ElementInner {
                host: EventTarget::new(),
                attributes: Mutex::new(HashMap::new()),
                base_url: Mutex::new(None),
                connection: Mutex::new(None),
                controller: ValidationController::new(coordinator, fingerprints),
                debouncer: Debouncer::new(debounce, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.schedule_check();
                    }
                }),
                running: watch::Sender::new(0),
                last_outcome: Mutex::new(None),
            }
        });
        Self { inner }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        lock(&self.inner.attributes).get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        lock(&self.inner.attributes).insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) {
        lock(&self.inner.attributes).remove(name);
    }

    /// Validation endpoint as an absolute URL, or `""` when unset.
    pub fn src(&self) -> String {
        self.inner.src()
    }

    pub fn set_src(&self, value: impl Into<String>) {
        self.set_attribute("src", value);
    }

    pub fn csrf(&self) -> String {
        self.inner.csrf()
    }

    pub fn set_csrf(&self, value: impl Into<String>) {
        self.set_attribute("csrf", value);
    }

    pub fn base_url(&self) -> Option<String> {
        lock(&self.inner.base_url).as_ref().map(|url| url.to_string())
    }

    /// Set the document base relative `src` values resolve against.
    pub fn set_base_url(&self, base: &str) -> ConfigResult<()> {
        let url = Url::parse(base).map_err(|error| ConfigError::InvalidBaseUrl {
            url: base.to_string(),
            reason: error.to_string(),
        })?;
        *lock(&self.inner.base_url) = Some(url);
        Ok(())
    }

    /// Apply the attributes from a configuration section.
    pub fn configure(&self, config: &ElementConfig) -> ConfigResult<()> {
        if let Some(base) = &config.base_url {
            self.set_base_url(base)?;
        }
        if let Some(src) = &config.src {
            self.set_src(src.clone());
        }
        if let Some(csrf) = &config.csrf {
            self.set_csrf(csrf.clone());
        }
        Ok(())
    }

    /// Start watching `input` for `change` and `input` events.
    ///
    /// An input attached earlier is detached first.
    pub fn attach(&self, input: InputElement) {
        self.detach();

        let listeners = [EventKind::Change, EventKind::Input].map(|kind| {
            let weak = Arc::downgrade(&self.inner);
            input.add_event_listener(kind, move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.debouncer.call();
                }
            })
        });
        input.target().set_parent(Some(&self.inner.host));

        *lock(&self.inner.connection) = Some(Connection { input, listeners });
    }

    /// Stop watching the attached input and drop its per-input state.
    pub fn detach(&self) -> Option<InputElement> {
        let connection = lock(&self.inner.connection).take()?;
        for id in connection.listeners {
            connection.input.remove_event_listener(id);
        }
        connection.input.target().set_parent(None);
        self.inner.controller.forget(connection.input.id());
        Some(connection.input)
    }

    pub fn input(&self) -> Option<InputElement> {
        self.inner.input()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.inner.connection).is_some()
    }

    /// Validate the attached input's current value now.
    ///
    /// Fails with a configuration error when `src` or `csrf` is missing and
    /// with [`AutoCheckError::NotConnected`] when no input is attached.
    pub async fn check(&self) -> Result<CheckOutcome> {
        self.inner.check().await
    }

    pub fn state(&self) -> CheckState {
        if self.inner.debouncer.is_pending() {
            return CheckState::Pending;
        }
        match self.input() {
            Some(input) if self.inner.controller.coordinator().is_pending(input.id()) => {
                CheckState::Checking
            }
            _ => CheckState::Idle,
        }
    }

    /// Outcome of the most recent check that was not superseded.
    pub fn last_outcome(&self) -> Option<CheckOutcome> {
        lock(&self.inner.last_outcome).clone()
    }

    pub fn host(&self) -> &EventTarget {
        &self.inner.host
    }

    pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        self.inner.host.add_event_listener(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.host.remove_event_listener(id)
    }

    /// Wait until no debounce timer is pending and no debounced check runs.
    pub async fn settled(&self) {
        let mut running = self.inner.running.subscribe();
        loop {
            self.inner.debouncer.idle().await;
            let _ = running.wait_for(|running| *running == 0).await;
            if !self.inner.debouncer.is_pending() {
                break;
            }
        }
    }
}

impl fmt::Debug for AutoCheckElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCheckElement")
            .field("src", &self.src())
            .field("connected", &self.is_connected())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::form::FormData;
    use crate::transport::Transport;
    use async_trait::async_trait;

    struct Accepting;

    #[async_trait]
    impl Transport for Accepting {
        async fn post(
            &self,
            _url: &str,
            _body: &FormData,
        ) -> std::result::Result<String, TransportError> {
            Ok(String::new())
        }
    }

    fn element() -> AutoCheckElement {
        AutoCheckElement::new(
            RequestCoordinator::new(Arc::new(Accepting)),
            FingerprintStore::new(),
            Duration::from_millis(300),
        )
    }

    #[test]
    fn test_src_resolves_against_base() {
        let element = element();
        assert_eq!(element.src(), "");

        element.set_base_url("https://example.com/users/new").unwrap();
        element.set_src("/validate");
        assert_eq!(element.src(), "https://example.com/validate");

        element.set_src("check");
        assert_eq!(element.src(), "https://example.com/users/check");

        element.set_src("");
        assert_eq!(element.src(), "");
    }

    #[test]
    fn test_src_without_base() {
        let element = element();
        element.set_src("https://example.com/validate");
        assert_eq!(element.src(), "https://example.com/validate");

        element.set_src("/validate");
        assert_eq!(element.src(), "/validate");
    }

    #[test]
    fn test_invalid_base_url() {
        let element = element();
        let error = element.set_base_url("not a url").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidBaseUrl { .. }));
        assert_eq!(element.base_url(), None);
    }

    #[test]
    fn test_csrf_attribute() {
        let element = element();
        assert_eq!(element.csrf(), "");
        element.set_csrf("tok1");
        assert_eq!(element.csrf(), "tok1");
        element.remove_attribute("csrf");
        assert_eq!(element.get_attribute("csrf"), None);
    }

    #[test]
    fn test_configure_applies_attributes() {
        let element = element();
        element
            .configure(&ElementConfig {
                src: Some("/validate".to_string()),
                csrf: Some("tok1".to_string()),
                base_url: Some("https://example.com/".to_string()),
            })
            .unwrap();
        assert_eq!(element.src(), "https://example.com/validate");
        assert_eq!(element.csrf(), "tok1");
    }

    #[test]
    fn test_attach_and_detach_manage_listeners() {
        let element = element();
        let input = InputElement::new();

        element.attach(input.clone());
        assert!(element.is_connected());
        assert_eq!(input.target().listener_count(EventKind::Input), 1);
        assert_eq!(input.target().listener_count(EventKind::Change), 1);
        assert!(input.target().has_parent());

        let detached = element.detach().unwrap();
        assert_eq!(detached, input);
        assert!(!element.is_connected());
        assert_eq!(input.target().listener_count(EventKind::Input), 0);
        assert_eq!(input.target().listener_count(EventKind::Change), 0);
        assert!(!input.target().has_parent());
        assert!(element.detach().is_none());
    }

    #[tokio::test]
    async fn test_check_requires_connection() {
        let element = element();
        element.set_src("https://example.com/validate");
        element.set_csrf("tok1");

        let result = element.check().await;
        assert!(matches!(result, Err(AutoCheckError::NotConnected)));
    }

    #[tokio::test]
    async fn test_check_records_last_outcome() {
        let element = element();
        element.set_src("https://example.com/validate");
        element.set_csrf("tok1");
        element.attach(InputElement::with_value("alice"));

        assert_eq!(element.check().await.unwrap(), CheckOutcome::Valid);
        assert_eq!(element.last_outcome(), Some(CheckOutcome::Valid));
        assert_eq!(element.state(), CheckState::Idle);
    }
}
