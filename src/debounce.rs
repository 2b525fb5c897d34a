//! Trailing-edge debouncing of a zero-argument action.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::lock;

/// Quiet period used by auto-check elements.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

type Action = Arc<dyn Fn() + Send + Sync>;

/// Collapses a burst of calls into one trailing invocation.
///
/// Every [`call`](Debouncer::call) reschedules the timer; the action runs once,
/// `wait` after the last call of a burst. Must be used inside a tokio runtime.
pub struct Debouncer {
    wait: Duration,
    action: Action,
    timer: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
    pending: Arc<watch::Sender<bool>>,
}

/// Clears the pending flag when the timer task that owns it ends, unless a
/// later call rescheduled in the meantime.
struct Fired {
    generation: Arc<AtomicU64>,
    scheduled: u64,
    pending: Arc<watch::Sender<bool>>,
}

impl Drop for Fired {
    fn drop(&mut self) {
        self.pending.send_if_modified(|pending| {
            if *pending && self.generation.load(Ordering::SeqCst) == self.scheduled {
                *pending = false;
                true
            } else {
                false
            }
        });
    }
}

impl Debouncer {
    pub fn new<F>(wait: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            wait,
            action: Arc::new(action),
            timer: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(watch::Sender::new(false)),
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn call(&self) {
        let mut timer = lock(&self.timer);

        let mut scheduled = 0;
        self.pending.send_modify(|pending| {
            scheduled = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *pending = true;
        });
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let fired = Fired {
            generation: self.generation.clone(),
            scheduled,
            pending: self.pending.clone(),
        };
        let action = self.action.clone();
        let wait = self.wait;
        *timer = Some(tokio::spawn(async move {
            let _fired = fired;
            sleep(wait).await;
            tracing::trace!("debounce window elapsed");
            action();
        }));
    }

    /// True while a scheduled invocation has not finished yet.
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    /// Resolve once no invocation is scheduled.
    pub async fn idle(&self) {
        let mut pending = self.pending.subscribe();
        let _ = pending.wait_for(|pending| !*pending).await;
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("wait", &self.wait)
            .field("pending", &self.is_pending())
            .finish()
    }
}
