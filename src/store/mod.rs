//! Clock state persistence
//!
//! Each clock owns three files in the state directory:
//! - primary: the committed record
//! - backup: the previous primary while a save is rotating files
//! - staging: the record being written
//!
//! A crash at any point of a save leaves a valid record in primary or backup.

mod artifacts;
mod persistent;

pub use artifacts::ArtifactPaths;
pub use persistent::PersistentStore;
