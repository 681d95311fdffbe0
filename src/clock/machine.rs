//! Lifecycle transitions
//!
//! | op     | valid from    | effect                                      |
//! |--------|---------------|---------------------------------------------|
//! | start  | NEW, STOPPED  | correction = 0, origin = now, RUNNING       |
//! | stop   | RUNNING       | correction = elapsed, STOPPED               |
//! | pause  | RUNNING       | correction = elapsed, PAUSED                |
//! | resume | PAUSED        | origin = now, RUNNING                       |

use crate::error::{ClockError, ClockResult};
use crate::models::{ClockSnapshot, LifecycleState};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Operation requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    Stop,
    Pause,
    Resume,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Start,
        Transition::Stop,
        Transition::Pause,
        Transition::Resume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Stop => "stop",
            Transition::Pause => "pause",
            Transition::Resume => "resume",
        }
    }

    /// Whether this operation is legal from `state`
    pub fn is_valid_from(self, state: LifecycleState) -> bool {
        match self {
            Transition::Start => state.can_start(),
            Transition::Stop | Transition::Pause => state == LifecycleState::Running,
            Transition::Resume => state == LifecycleState::Paused,
        }
    }

    /// Apply to `snapshot` at monotonic time `now`
    ///
    /// The snapshot is untouched when the transition is rejected.
    pub fn apply(self, snapshot: &mut ClockSnapshot, now: Instant) -> ClockResult<()> {
        if !self.is_valid_from(snapshot.state) {
            return Err(ClockError::InvalidTransition {
                op: self.as_str(),
                from: snapshot.state,
            });
        }

        match self {
            Transition::Start => {
                snapshot.correction = 0;
                snapshot.start_instant = now;
                snapshot.state = LifecycleState::Running;
            }
            Transition::Stop => {
                snapshot.rebase(now);
                snapshot.state = LifecycleState::Stopped;
            }
            Transition::Pause => {
                snapshot.rebase(now);
                snapshot.state = LifecycleState::Paused;
            }
            Transition::Resume => {
                snapshot.start_instant = now;
                snapshot.state = LifecycleState::Running;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Transition::Start),
            "stop" => Ok(Transition::Stop),
            "pause" => Ok(Transition::Pause),
            "resume" => Ok(Transition::Resume),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}
