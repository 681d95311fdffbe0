// Durable Clock - crash-recoverable stopwatch
// Elapsed active time survives restarts through an atomic three-file store

pub mod cli;
pub mod clock;
pub mod codec;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod store;

pub use anyhow::{Context, Result};

// Re-export commonly used types
pub use clock::{Clock, Subscription, Transition};
pub use config::ClockConfig;
pub use error::{ClockError, ClockResult, DecodeError, StoreError};
pub use models::{ClockIdentity, LifecycleState, Observation, PersistedRecord};
pub use store::PersistentStore;
