//! Element definitions.
//!
//! A registry maps element names to factories. [`define_auto_check`] is the
//! idempotent registration of the `auto-check` element.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::controller::FingerprintStore;
use crate::coordinator::RequestCoordinator;
use crate::debounce::DEFAULT_DEBOUNCE;
use crate::element::AutoCheckElement;
use crate::error::RegistryError;
use crate::lock;
use crate::transport::Transport;

pub const AUTO_CHECK_TAG: &str = "auto-check";

/// Creates auto-check elements that share one coordinator and one
/// fingerprint store.
#[derive(Clone, Debug)]
pub struct AutoCheckFactory {
    coordinator: RequestCoordinator,
    fingerprints: FingerprintStore,
    debounce: Duration,
}

impl AutoCheckFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            coordinator: RequestCoordinator::new(transport),
            fingerprints: FingerprintStore::new(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn create(&self) -> AutoCheckElement {
        AutoCheckElement::new(
            self.coordinator.clone(),
            self.fingerprints.clone(),
            self.debounce,
        )
    }
}

#[derive(Debug, Default)]
pub struct ElementRegistry {
    definitions: Mutex<HashMap<String, AutoCheckFactory>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &self,
        name: impl Into<String>,
        factory: AutoCheckFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut definitions = lock(&self.definitions);
        if definitions.contains_key(&name) {
            return Err(RegistryError::AlreadyDefined(name));
        }
        tracing::debug!(name = %name, "defining element");
        definitions.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<AutoCheckFactory> {
        lock(&self.definitions).get(name).cloned()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        lock(&self.definitions).contains_key(name)
    }

    pub fn create(&self, name: &str) -> Result<AutoCheckElement, RegistryError> {
        self.get(name)
            .map(|factory| factory.create())
            .ok_or_else(|| RegistryError::Undefined(name.to_string()))
    }
}

/// Define `auto-check` unless something already claimed the name.
///
/// Returns true if this call performed the definition.
pub fn define_auto_check(registry: &ElementRegistry, factory: AutoCheckFactory) -> bool {
    let mut definitions = lock(&registry.definitions);
    if definitions.contains_key(AUTO_CHECK_TAG) {
        return false;
    }
    definitions.insert(AUTO_CHECK_TAG.to_string(), factory);
    true
}

/// Process-wide registry.
pub fn global() -> &'static ElementRegistry {
    static GLOBAL: OnceLock<ElementRegistry> = OnceLock::new();
    GLOBAL.get_or_init(ElementRegistry::new)
}
