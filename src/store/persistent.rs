//! PersistentStore - crash-safe load and atomic save of clock records

use super::artifacts::{remove_if_exists, rename_if_exists, ArtifactPaths};
use crate::codec::{self, RECORD_LEN};
use crate::error::StoreError;
use crate::models::{
    wall_clock_nanos, ClockIdentity, ClockSnapshot, LifecycleState, PersistedRecord,
};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Store for the artifacts of clocks living in one directory
#[derive(Debug, Clone)]
pub struct PersistentStore {
    dir: PathBuf,
    durable_writes: bool,
}

impl PersistentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            durable_writes: true,
        }
    }

    /// Toggle flushing the staging file to the device before rotation
    pub fn with_durable_writes(mut self, durable: bool) -> Self {
        self.durable_writes = durable;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn paths(&self, id: &ClockIdentity) -> ArtifactPaths {
        ArtifactPaths::new(&self.dir, id)
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load the snapshot for `id`, creating and persisting a fresh one if none exists
    ///
    /// A corrupt or unreadable primary is deleted before the error is returned,
    /// so the next attempt starts fresh.
    pub fn load(&self, id: &ClockIdentity) -> Result<ClockSnapshot, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let paths = self.paths(id);

        if !paths.primary.exists() && paths.backup.exists() {
            tracing::info!(clock = %id, "recovering state from backup");
            fs::rename(&paths.backup, &paths.primary)?;
        }

        if !paths.primary.exists() {
            tracing::info!(clock = %id, "new clock");
            let snapshot = ClockSnapshot::fresh();
            if let Err(e) = self.save(id, &snapshot) {
                tracing::warn!(clock = %id, error = %e, "unable to save new clock");
            }
            return Ok(snapshot);
        }

        tracing::info!(clock = %id, "reading state");
        let record = match read_record(&paths.primary) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(clock = %id, error = %e, "unable to load clock, discarding state");
                if let Err(rm) = remove_if_exists(&paths.primary) {
                    tracing::warn!(clock = %id, error = %rm, "unable to delete corrupt state");
                }
                return Err(e);
            }
        };

        Ok(restore(id, &record, wall_clock_nanos(), Instant::now()))
    }

    /// Read the committed record without recovering or mutating anything
    pub fn peek(&self, id: &ClockIdentity) -> Result<Option<PersistedRecord>, StoreError> {
        let paths = self.paths(id);
        for path in [&paths.primary, &paths.backup] {
            if path.exists() {
                return read_record(path).map(Some);
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Atomically replace the committed record with `snapshot`
    ///
    /// At every point at least one of primary/backup holds a valid record.
    pub fn save(&self, id: &ClockIdentity, snapshot: &ClockSnapshot) -> Result<(), StoreError> {
        let paths = self.paths(id);
        let bytes = codec::encode(&snapshot.to_record());

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&paths.staging)?;
        file.write_all(&bytes)?;
        if self.durable_writes {
            file.sync_all()?;
        }
        drop(file);

        remove_if_exists(&paths.backup)?;
        rename_if_exists(&paths.primary, &paths.backup)?;
        fs::rename(&paths.staging, &paths.primary)?;
        remove_if_exists(&paths.backup)?;

        tracing::trace!(clock = %id, state = %snapshot.state, "saved");
        Ok(())
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    /// Delete every artifact of `id`; missing files are not an error
    pub fn destroy(&self, id: &ClockIdentity) -> io::Result<()> {
        let paths = self.paths(id);
        for path in paths.all() {
            remove_if_exists(path)?;
        }
        tracing::info!(clock = %id, "destroyed state");
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<PersistedRecord, StoreError> {
    let mut buf = Vec::with_capacity(RECORD_LEN);
    fs::File::open(path)?.take(RECORD_LEN as u64).read_to_end(&mut buf)?;
    Ok(codec::decode(&buf)?)
}

/// Rebuild the in-memory snapshot from a record saved at `record.wall_clock_save_time`
///
/// A running clock is credited with the wall-clock gap since that save.
fn restore(
    id: &ClockIdentity,
    record: &PersistedRecord,
    now_wall: i64,
    now: Instant,
) -> ClockSnapshot {
    if record.state == LifecycleState::Running && now_wall < record.wall_clock_save_time {
        tracing::warn!(
            clock = %id,
            gap_ns = now_wall.saturating_sub(record.wall_clock_save_time),
            "wall clock moved backwards, ignoring gap"
        );
    }

    ClockSnapshot {
        correction: record.projected_elapsed(now_wall),
        start_instant: now,
        state: record.state,
    }
}
