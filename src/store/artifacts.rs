//! Artifact naming for one clock identity

use crate::models::ClockIdentity;
use std::io;
use std::path::{Path, PathBuf};

const PRIMARY_PREFIX: &str = ".timer-";
const BACKUP_PREFIX: &str = ".~timer-";
const STAGING_PREFIX: &str = ".!timer-";

/// The three files backing one clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Last committed record
    pub primary: PathBuf,
    /// Previous primary, present only mid-rotation
    pub backup: PathBuf,
    /// Record being written
    pub staging: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, id: &ClockIdentity) -> Self {
        Self {
            primary: dir.join(format!("{}{}", PRIMARY_PREFIX, id)),
            backup: dir.join(format!("{}{}", BACKUP_PREFIX, id)),
            staging: dir.join(format!("{}{}", STAGING_PREFIX, id)),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.primary, &self.backup, &self.staging]
    }

    /// True when any artifact exists
    pub fn any_exists(&self) -> bool {
        self.all().iter().any(|p| p.exists())
    }
}

/// Remove a file, treating a missing file as success
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Rename a file, treating a missing source as success
pub(crate) fn rename_if_exists(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
