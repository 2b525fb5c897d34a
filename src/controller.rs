//! The check state machine.
//!
//! One [`ValidationController::check`] call walks a fixed notification
//! order: `autocheck:send`, then either an early exit or `loadstart`,
//! `load`/`error` with the matching `autocheck:success`/`autocheck:error`,
//! and finally `loadend` plus `autocheck:complete`.

use serde::Serialize;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use crate::classify::error_message;
use crate::coordinator::RequestCoordinator;
use crate::error::{ConfigError, Result, TransportError};
use crate::events::{Event, EventKind, EventTarget};
use crate::form::{Fingerprint, FormData};
use crate::input::{InputElement, InputId};
use crate::lock;

/// Observable phase of an auto-check element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckState {
    /// Nothing scheduled or in flight.
    Idle,
    /// Debounce timer running.
    Pending,
    /// Validation request in flight.
    Checking,
}

/// How a single check ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CheckOutcome {
    /// Same submission as the previous one for this input; nothing sent.
    Unchanged,
    /// Blank value; nothing sent.
    Empty,
    /// 2xx with a blank body.
    Valid,
    /// 2xx with a non-blank body, trimmed.
    Warning(String),
    /// Rejected or failed, with the server's message when it sent one.
    Invalid(Option<String>),
    /// A newer check for the same input took over; nothing was reported.
    Superseded,
}

/// Last submitted fingerprint per input.
#[derive(Debug, Clone, Default)]
pub struct FingerprintStore {
    inner: Arc<Mutex<HashMap<InputId, Fingerprint>>>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fingerprint` for `input`. Returns false if it equals the one
    /// already stored.
    pub fn record(&self, input: InputId, fingerprint: Fingerprint) -> bool {
        let mut stored = lock(&self.inner);
        if stored.get(&input) == Some(&fingerprint) {
            return false;
        }
        stored.insert(input, fingerprint);
        true
    }

    pub fn get(&self, input: InputId) -> Option<Fingerprint> {
        lock(&self.inner).get(&input).cloned()
    }

    pub fn forget(&self, input: InputId) {
        lock(&self.inner).remove(&input);
    }
}

/// Drives checks for the inputs of one element.
#[derive(Debug)]
pub struct ValidationController {
    coordinator: RequestCoordinator,
    fingerprints: FingerprintStore,
    latest: Mutex<HashMap<InputId, u64>>,
}

impl ValidationController {
    pub fn new(coordinator: RequestCoordinator, fingerprints: FingerprintStore) -> Self {
        Self {
            coordinator,
            fingerprints,
            latest: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn fingerprints(&self) -> &FingerprintStore {
        &self.fingerprints
    }

    /// Validate the current value of `input` against `src`.
    ///
    /// Returns `Err` only for missing configuration, before any notification
    /// fires. Request failures are reported as notifications and
    /// [`CheckOutcome::Invalid`].
    pub async fn check(
        &self,
        input: &InputElement,
        host: &EventTarget,
        src: &str,
        csrf: &str,
    ) -> Result<CheckOutcome> {
        if src.is_empty() {
            return Err(ConfigError::MissingSrc.into());
        }
        if csrf.is_empty() {
            return Err(ConfigError::MissingCsrf.into());
        }

        let mut body = FormData::new();
        body.append("authenticity_token", csrf);
        body.append("value", input.value());

        let mut send = Event::send(body);
        if !emit(input.target(), &mut send) {
            tracing::debug!(input = %input.id(), "autocheck:send was canceled; sending anyway");
        }
        let body = send.body_mut().map(std::mem::take).unwrap_or_default();

        let blank = input.value().trim().is_empty();
        if !self.fingerprints.record(input.id(), body.fingerprint()) {
            tracing::trace!(input = %input.id(), "submission unchanged; skipping request");
            if blank {
                emit(input.target(), &mut Event::complete());
            }
            return Ok(CheckOutcome::Unchanged);
        }

        if blank {
            emit(input.target(), &mut Event::complete());
            return Ok(CheckOutcome::Empty);
        }

        emit(host, &mut Event::lifecycle(EventKind::LoadStart));
        let pending = {
            let mut latest = lock(&self.latest);
            let pending = self.coordinator.perform_check(input.id(), body, src);
            latest.insert(input.id(), pending.id());
            pending
        };
        let request = pending.id();

        let result = pending.settle().await;

        if !self.retire(input.id(), request) {
            tracing::debug!(input = %input.id(), request, "discarding settlement of superseded check");
            return Ok(CheckOutcome::Superseded);
        }

        let outcome = outcome_of(&result);
        report(input, host, &outcome);

        emit(host, &mut Event::lifecycle(EventKind::LoadEnd));
        emit(input.target(), &mut Event::complete());

        Ok(outcome)
    }

    /// Drop all per-input state for `input`, aborting its pending request.
    pub fn forget(&self, input: InputId) {
        self.coordinator.cancel(input);
        self.fingerprints.forget(input);
        lock(&self.latest).remove(&input);
    }

    /// Clear the latest-request marker if it still belongs to `request`.
    fn retire(&self, input: InputId, request: u64) -> bool {
        let mut latest = lock(&self.latest);
        if latest.get(&input) == Some(&request) {
            latest.remove(&input);
            true
        } else {
            false
        }
    }
}

fn outcome_of(result: &std::result::Result<String, TransportError>) -> CheckOutcome {
    match result {
        Ok(text) => match text.trim() {
            "" => CheckOutcome::Valid,
            warning => CheckOutcome::Warning(warning.to_string()),
        },
        Err(error) => CheckOutcome::Invalid(error_message(error)),
    }
}

/// Dispatch `event`, containing any listener panic.
///
/// Returns false only when a listener canceled the event.
fn emit(target: &EventTarget, event: &mut Event) -> bool {
    match catch_unwind(AssertUnwindSafe(|| target.dispatch(event))) {
        Ok(proceed) => proceed,
        Err(_) => {
            tracing::error!(event = event.name(), "listener panicked");
            true
        }
    }
}

fn report(input: &InputElement, host: &EventTarget, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Valid | CheckOutcome::Warning(_) => {
            emit(host, &mut Event::lifecycle(EventKind::Load));
            let warning = match outcome {
                CheckOutcome::Warning(warning) => Some(warning.clone()),
                _ => None,
            };
            emit(input.target(), &mut Event::success(warning));
        }
        CheckOutcome::Invalid(message) => {
            emit(host, &mut Event::lifecycle(EventKind::LoadError));
            emit(input.target(), &mut Event::error(message.clone()));
        }
        CheckOutcome::Unchanged | CheckOutcome::Empty | CheckOutcome::Superseded => {}
    }
}
