//! ListenerRegistry - observers notified after every sync tick

use crate::models::Observation;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked with the snapshot persisted by a tick
pub type Listener = Arc<dyn Fn(&Observation) + Send + Sync>;

/// Handle returned by registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Set of listeners keyed by registration, not by behavior
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, listener);
        Subscription(id)
    }

    /// Returns false if the subscription was already removed
    pub fn remove(&self, subscription: Subscription) -> bool {
        self.lock().remove(&subscription.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invoke every listener with `observation`, returning how many panicked
    ///
    /// The set is copied first, so listeners may add or remove subscriptions.
    pub fn notify(&self, observation: &Observation) -> usize {
        let listeners: Vec<Listener> = self.lock().values().cloned().collect();

        let mut failed = 0;
        for listener in listeners {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(observation)));
            if result.is_err() {
                failed += 1;
                tracing::warn!(state = %observation.state, "clock listener panicked");
            }
        }
        failed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
