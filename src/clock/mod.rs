//! Durable clock
//!
//! A [`Clock`] owns its in-memory snapshot, the store holding its three
//! artifacts and a background sync worker. One mutex guards the snapshot
//! and every save, so each persisted record is a consistent view.

mod listeners;
mod machine;
mod worker;

pub use listeners::{Listener, ListenerRegistry, Subscription};
pub use machine::Transition;

use crate::config::ClockConfig;
use crate::error::{ClockError, ClockResult};
use crate::models::{ClockIdentity, ClockSnapshot, LifecycleState, Observation};
use crate::store::{ArtifactPaths, PersistentStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use worker::SyncWorker;

/// State shared between the clock handle and its worker
pub(crate) struct Shared {
    pub(crate) id: ClockIdentity,
    store: PersistentStore,
    snapshot: Mutex<ClockSnapshot>,
    pub(crate) listeners: ListenerRegistry,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ClockSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort save; failures are logged and the snapshot is left as is
    fn persist(&self, snapshot: &ClockSnapshot) {
        if let Err(e) = self.store.save(&self.id, snapshot) {
            tracing::warn!(clock = %self.id, error = %e, "unable to save clock");
        }
    }

    /// One worker tick: rebase, persist, and report what was persisted
    pub(crate) fn tick(&self) -> Observation {
        let mut snapshot = self.lock();
        let now = Instant::now();
        snapshot.rebase(now);
        self.persist(&snapshot);

        Observation {
            state: snapshot.state,
            elapsed: snapshot.elapsed_at(now),
        }
    }
}

/// Crash-recoverable stopwatch
pub struct Clock {
    shared: Arc<Shared>,
    worker: Option<SyncWorker>,
}

impl Clock {
    /// Load (or create) the clock `id` and start its sync worker
    ///
    /// Fails with [`ClockError::Recovery`] when existing state cannot be read;
    /// the corrupt primary is deleted, so a retry starts a fresh clock.
    pub fn open(id: ClockIdentity, config: &ClockConfig) -> ClockResult<Self> {
        let store = config.store();
        let snapshot = store
            .load(&id)
            .map_err(|source| ClockError::Recovery { id, source })?;

        tracing::debug!(
            clock = %id,
            state = %snapshot.state,
            correction = snapshot.correction,
            "clock opened"
        );

        let shared = Arc::new(Shared {
            id,
            store,
            snapshot: Mutex::new(snapshot),
            listeners: ListenerRegistry::new(),
        });

        let worker = SyncWorker::spawn(Arc::clone(&shared), config.tick_interval())
            .map_err(ClockError::WorkerSpawn)?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Open with default settings in `dir`
    pub fn open_in(dir: impl Into<PathBuf>, id: ClockIdentity) -> ClockResult<Self> {
        Self::open(id, &ClockConfig::with_state_dir(dir))
    }

    pub fn id(&self) -> ClockIdentity {
        self.shared.id
    }

    /// Paths of the artifacts backing this clock
    pub fn artifacts(&self) -> ArtifactPaths {
        self.shared.store.paths(&self.shared.id)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    pub fn start(&self) -> ClockResult<()> {
        self.apply(Transition::Start)
    }

    pub fn stop(&self) -> ClockResult<()> {
        self.apply(Transition::Stop)
    }

    pub fn pause(&self) -> ClockResult<()> {
        self.apply(Transition::Pause)
    }

    pub fn resume(&self) -> ClockResult<()> {
        self.apply(Transition::Resume)
    }

    /// Check, mutate and persist under the clock lock
    pub fn apply(&self, transition: Transition) -> ClockResult<()> {
        let mut snapshot = self.shared.lock();
        let from = snapshot.state;
        transition.apply(&mut snapshot, Instant::now())?;

        tracing::debug!(
            clock = %self.shared.id,
            op = transition.as_str(),
            from = %from,
            to = %snapshot.state,
            "transition"
        );
        self.shared.persist(&snapshot);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().state
    }

    /// Elapsed active time in nanoseconds
    pub fn elapsed(&self) -> i64 {
        self.shared.lock().elapsed()
    }

    /// State and elapsed time read under one lock
    pub fn observe(&self) -> Observation {
        self.shared.lock().observation()
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a callback run after every tick with the persisted observation
    pub fn add_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Observation) + Send + Sync + 'static,
    {
        self.shared.listeners.add(Arc::new(listener))
    }

    pub fn remove_listener(&self, subscription: Subscription) -> bool {
        self.shared.listeners.remove(subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stop the worker and save a final record, keeping it for later recovery
    pub fn close(mut self) -> ClockResult<()> {
        self.shutdown()?;
        let snapshot = self.shared.lock();
        self.shared.persist(&snapshot);
        tracing::info!(clock = %self.shared.id, state = %snapshot.state, "clock closed");
        Ok(())
    }

    /// Stop the worker, wait for it to exit, then delete every artifact
    pub fn destroy(mut self) -> ClockResult<()> {
        let stopped = self.shutdown();
        self.shared
            .store
            .destroy(&self.shared.id)
            .map_err(ClockError::Destroy)?;
        stopped
    }

    fn shutdown(&mut self) -> ClockResult<()> {
        match self.worker.take() {
            Some(worker) => worker
                .stop()
                .map_err(|_| ClockError::WorkerPanicked(self.shared.id)),
            None => Ok(()),
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(clock = %self.shared.id, error = %e, "sync worker did not stop cleanly");
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("id", &self.shared.id)
            .field("store", &self.shared.store.dir())
            .field("running_worker", &self.worker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> Clock {
        Clock::open_in(temp.path(), ClockIdentity::generate()).unwrap()
    }

    #[test]
    fn test_new_clock_starts_in_new_state() {
        let temp = TempDir::new().unwrap();
        let clock = open(&temp);

        assert_eq!(clock.state(), LifecycleState::New);
        assert_eq!(clock.elapsed(), 0);
        assert!(clock.artifacts().primary.exists());
        clock.destroy().unwrap();
    }

    #[test]
    fn test_invalid_transitions_surface_immediately() {
        let temp = TempDir::new().unwrap();
        let clock = open(&temp);

        assert!(matches!(
            clock.pause(),
            Err(ClockError::InvalidTransition { op: "pause", from: LifecycleState::New })
        ));
        clock.start().unwrap();
        assert!(matches!(
            clock.start(),
            Err(ClockError::InvalidTransition { op: "start", from: LifecycleState::Running })
        ));
        assert_eq!(clock.state(), LifecycleState::Running);
        clock.destroy().unwrap();
    }

    #[test]
    fn test_transition_is_persisted_immediately() {
        let temp = TempDir::new().unwrap();
        let config = ClockConfig {
            state_dir: temp.path().to_path_buf(),
            // Long interval so only the transition itself can have saved
            tick_interval_ms: 60_000,
            durable_writes: false,
        };
        let clock = Clock::open(ClockIdentity::generate(), &config).unwrap();
        thread::sleep(Duration::from_millis(20));

        clock.start().unwrap();
        let record = config.store().peek(&clock.id()).unwrap().unwrap();
        assert_eq!(record.state, LifecycleState::Running);
        clock.destroy().unwrap();
    }

    #[test]
    fn test_listener_can_read_clock_without_deadlock() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(open(&temp));
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&clock);
        let counter = Arc::clone(&calls);
        clock.add_listener(move |_| {
            if let Some(clock) = weak.upgrade() {
                let _ = clock.observe();
            }
            counter.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(200));
        assert!(calls.load(Ordering::SeqCst) >= 1);

        // The worker may briefly hold an upgraded handle
        let mut shared = clock;
        let clock = loop {
            match Arc::try_unwrap(shared) {
                Ok(clock) => break clock,
                Err(still_shared) => {
                    shared = still_shared;
                    thread::sleep(Duration::from_millis(1));
                }
            }
        };
        clock.destroy().unwrap();
    }

    #[test]
    fn test_last_handle_dropped_inside_listener() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(open(&temp));
        let paths = clock.artifacts();
        let slot: Arc<Mutex<Option<Arc<Clock>>>> = Arc::new(Mutex::new(None));
        let outcome: Arc<Mutex<Option<bool>>> = Arc::new(Mutex::new(None));

        let holder = Arc::clone(&slot);
        let report = Arc::clone(&outcome);
        clock.add_listener(move |_| {
            let taken = holder.lock().unwrap().take();
            if let Some(last) = taken {
                let dropped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                    drop(last)
                }));
                *report.lock().unwrap() = Some(dropped.is_ok());
            }
        });
        // The listener now owns the only strong handle
        *slot.lock().unwrap() = Some(clock);

        let mut waited = 0;
        while outcome.lock().unwrap().is_none() && waited < 2_000 {
            thread::sleep(Duration::from_millis(5));
            waited += 5;
        }
        assert_eq!(*outcome.lock().unwrap(), Some(true));
        assert!(paths.primary.exists());
    }

    #[test]
    fn test_drop_stops_worker_and_keeps_state() {
        let temp = TempDir::new().unwrap();
        let clock = open(&temp);
        let paths = clock.artifacts();
        drop(clock);

        assert!(paths.primary.exists());
    }
}
