//! Error taxonomy
//!
//! Construction failures are fatal and surfaced to the caller, transition
//! misuse is reported synchronously, and save failures never leave the
//! store (they are logged where they happen).

use crate::models::{ClockIdentity, LifecycleState};

/// Errors raised while decoding a persisted record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record too short: {0} bytes")]
    Truncated(usize),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Integrity { stored: u32, computed: u32 },

    #[error("unknown state tag {0}")]
    InvalidStateTag(i32),
}

/// Errors raised by the persistent store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt state record: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors surfaced by [`crate::Clock`]
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("unable to recover clock {id}: {source}")]
    Recovery {
        id: ClockIdentity,
        #[source]
        source: StoreError,
    },

    #[error("cannot {op} a clock in state {from}")]
    InvalidTransition {
        op: &'static str,
        from: LifecycleState,
    },

    #[error("failed to spawn sync worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("failed to delete state: {0}")]
    Destroy(#[source] std::io::Error),

    #[error("sync worker for clock {0} panicked")]
    WorkerPanicked(ClockIdentity),
}

impl ClockError {
    /// True when a recovery failed because the stored state tag was unknown
    pub fn is_invalid_state_tag(&self) -> bool {
        matches!(
            self,
            ClockError::Recovery {
                source: StoreError::Decode(DecodeError::InvalidStateTag(_)),
                ..
            }
        )
    }

    pub fn is_recovery(&self) -> bool {
        matches!(self, ClockError::Recovery { .. })
    }
}

/// Result type for clock operations
pub type ClockResult<T> = std::result::Result<T, ClockError>;
