pub mod clock;

pub use clock::{
    wall_clock_nanos, ClockIdentity, ClockSnapshot, LifecycleState, Observation, PersistedRecord,
};
