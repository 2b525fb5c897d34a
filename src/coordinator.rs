//! Per-input request coordination.
//!
//! Each input has at most one validation request in flight. Starting a new
//! one aborts the previous request for that input. A request unregisters
//! itself when it settles, but only if it is still the registered one, so a
//! late settlement of a superseded request never clears its successor.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

use crate::error::TransportError;
use crate::form::FormData;
use crate::input::InputId;
use crate::lock;
use crate::transport::Transport;

struct PendingRequest {
    id: u64,
    abort: AbortHandle,
}

type PendingMap = Arc<Mutex<HashMap<InputId, PendingRequest>>>;

/// Owns the pending-request handle of every input.
#[derive(Clone)]
pub struct RequestCoordinator {
    transport: Arc<dyn Transport>,
    pending: PendingMap,
    next_id: Arc<AtomicU64>,
}

impl RequestCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start a validation request for `input`, superseding any pending one.
    ///
    /// Registration happens before this returns; the request runs on its own
    /// task whether or not the returned handle is awaited.
    pub fn perform_check(&self, input: InputId, body: FormData, url: &str) -> PendingCheck {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut pending = lock(&self.pending);

        if let Some(previous) = pending.remove(&input) {
            tracing::debug!(%input, request = previous.id, "aborting superseded request");
            previous.abort.abort();
        }

        let transport = self.transport.clone();
        let registry = self.pending.clone();
        let url = url.to_string();
        let handle = tokio::spawn(async move {
            let result = transport.post(&url, &body).await;
            let mut pending = lock(&registry);
            if pending.get(&input).is_some_and(|current| current.id == id) {
                pending.remove(&input);
            }
            result
        });

        pending.insert(
            input,
            PendingRequest {
                id,
                abort: handle.abort_handle(),
            },
        );

        PendingCheck { id, handle }
    }

    /// Abort and forget the pending request for `input`, if any.
    pub fn cancel(&self, input: InputId) -> bool {
        match lock(&self.pending).remove(&input) {
            Some(request) => {
                request.abort.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, input: InputId) -> bool {
        lock(&self.pending).contains_key(&input)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Handle to one in-flight request.
#[derive(Debug)]
pub struct PendingCheck {
    id: u64,
    handle: JoinHandle<Result<String, TransportError>>,
}

impl PendingCheck {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the request to settle. Aborted requests resolve to
    /// [`FailureKind::Aborted`](crate::error::FailureKind::Aborted).
    pub async fn settle(self) -> Result<String, TransportError> {
        match self.handle.await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => Err(TransportError::aborted()),
            Err(error) => {
                tracing::error!(request = self.id, %error, "validation request task panicked");
                Err(TransportError::network(0))
            }
        }
    }
}
