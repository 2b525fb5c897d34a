//! # auto-check Library
//!
//! Live validation of a text input against a remote endpoint: input events are
//! debounced, the value is posted with a CSRF token, in-flight requests for the
//! same input are superseded, and the outcome is reported through typed
//! notifications.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod classify;
pub mod cli;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod debounce;
pub mod element;
pub mod error;
pub mod events;
pub mod form;
pub mod input;
pub mod output;
pub mod registry;
pub mod transport;

pub use classify::error_message;
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use controller::{CheckOutcome, CheckState, FingerprintStore, ValidationController};
pub use coordinator::{PendingCheck, RequestCoordinator};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use element::AutoCheckElement;
pub use error::{
    AutoCheckError, ConfigError, FailureKind, RegistryError, Result, TransportError,
};
pub use events::{Event, EventDetail, EventKind, EventTarget, ListenerId};
pub use form::{Fingerprint, FormData};
pub use input::{InputElement, InputId};
pub use output::Output;
pub use registry::{AUTO_CHECK_TAG, AutoCheckFactory, ElementRegistry, define_auto_check};
pub use transport::{HttpTransport, Transport, TransportConfig};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
