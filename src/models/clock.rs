//! Clock data model
//!
//! In-memory snapshot, persisted record and the lifecycle states shared by
//! the codec, the store and the state machine.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

/// Globally unique identity of one clock and its on-disk artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClockIdentity(Uuid);

impl ClockIdentity {
    /// Generate a fresh random identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hyphenated lowercase form, used verbatim in artifact names
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ClockIdentity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state values
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    New,
    Running,
    Paused,
    Stopped,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 4] = [
        LifecycleState::New,
        LifecycleState::Running,
        LifecycleState::Paused,
        LifecycleState::Stopped,
    ];

    /// Integer tag written to disk
    pub fn tag(self) -> i32 {
        match self {
            LifecycleState::New => 0,
            LifecycleState::Running => 1,
            LifecycleState::Paused => 2,
            LifecycleState::Stopped => 3,
        }
    }

    /// Inverse of [`LifecycleState::tag`]; `None` for unknown tags
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(LifecycleState::New),
            1 => Some(LifecycleState::Running),
            2 => Some(LifecycleState::Paused),
            3 => Some(LifecycleState::Stopped),
            _ => None,
        }
    }

    /// States a fresh running period may begin from
    pub fn can_start(self) -> bool {
        matches!(self, LifecycleState::New | LifecycleState::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::New => "NEW",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Paused => "PAUSED",
            LifecycleState::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-layout record stored in each artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedRecord {
    /// Elapsed active time (ns) up to the last state change or tick
    pub correction: i64,
    /// Wall-clock time of the save, ns since the Unix epoch
    pub wall_clock_save_time: i64,
    pub state: LifecycleState,
}

impl PersistedRecord {
    /// Elapsed time this record implies at wall-clock time `now_wall`
    ///
    /// A running clock is credited with the gap since the save; a negative
    /// gap (wall clock moved backwards) is ignored.
    pub fn projected_elapsed(&self, now_wall: i64) -> i64 {
        match self.state {
            LifecycleState::Running => {
                let gap = now_wall.saturating_sub(self.wall_clock_save_time).max(0);
                self.correction.saturating_add(gap)
            }
            _ => self.correction,
        }
    }
}

/// In-memory accounting guarded by the clock lock
#[derive(Debug, Clone, Copy)]
pub struct ClockSnapshot {
    pub correction: i64,
    /// Only meaningful while `state == Running`
    pub start_instant: Instant,
    pub state: LifecycleState,
}

impl ClockSnapshot {
    /// Snapshot of a clock that has never been started
    pub fn fresh() -> Self {
        Self {
            correction: 0,
            start_instant: Instant::now(),
            state: LifecycleState::New,
        }
    }

    /// Elapsed active time in nanoseconds as of `now`
    pub fn elapsed_at(&self, now: Instant) -> i64 {
        match self.state {
            LifecycleState::Running => {
                nanos_between(self.start_instant, now).saturating_add(self.correction)
            }
            _ => self.correction,
        }
    }

    pub fn elapsed(&self) -> i64 {
        self.elapsed_at(Instant::now())
    }

    /// Fold the running period into `correction` and restart the origin at `now`
    ///
    /// The elapsed value is unchanged.
    pub fn rebase(&mut self, now: Instant) {
        self.correction = self.elapsed_at(now);
        self.start_instant = now;
    }

    /// Record to persist for this snapshot, stamped with the current wall clock
    ///
    /// The correction written is the elapsed value at the save instant, so a
    /// running clock's record and its wall-clock stamp describe the same moment.
    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            correction: self.elapsed(),
            wall_clock_save_time: wall_clock_nanos(),
            state: self.state,
        }
    }

    pub fn observation(&self) -> Observation {
        Observation {
            state: self.state,
            elapsed: self.elapsed(),
        }
    }
}

/// Value copy of a clock's externally visible state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub state: LifecycleState,
    /// Elapsed active time in nanoseconds
    pub elapsed: i64,
}

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn wall_clock_nanos() -> i64 {
    // Out of range only after the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

fn nanos_between(earlier: Instant, later: Instant) -> i64 {
    i64::try_from(later.saturating_duration_since(earlier).as_nanos()).unwrap_or(i64::MAX)
}
