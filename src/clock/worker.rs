//! SyncWorker - periodic persist-and-notify loop
//!
//! Each tick rebases the running origin, saves the snapshot and then
//! notifies listeners with exactly what was saved. The worker waits one
//! interval between ticks and exits as soon as it is cancelled.

use super::Shared;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to the background thread of one clock
pub(crate) struct SyncWorker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl SyncWorker {
    pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration) -> io::Result<Self> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let name = format!("clock-sync-{}", shared.id);

        let handle = thread::Builder::new().name(name).spawn(move || {
            tracing::debug!(clock = %shared.id, ?interval, "sync worker started");
            loop {
                let observation = shared.tick();
                shared.listeners.notify(&observation);

                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!(clock = %shared.id, "sync worker stopped");
        })?;

        Ok(Self { cancel, handle })
    }

    /// Signal cancellation and block until the thread has exited
    ///
    /// When called from the worker itself (a listener dropped the last
    /// handle to its clock) the loop exits after the current tick and the
    /// thread is left detached.
    pub(crate) fn stop(self) -> thread::Result<()> {
        // A send error means the thread is already gone; join reports why
        let _ = self.cancel.send(());
        if self.handle.thread().id() == thread::current().id() {
            tracing::debug!("sync worker cancelled from its own thread");
            return Ok(());
        }
        self.handle.join()
    }
}
