//! Human-readable rendering of clock observations

use crate::models::{LifecycleState, Observation};
use colored::{ColoredString, Colorize};

const NANOS_PER_CENTI: i64 = 10_000_000;

/// Render nanoseconds as `H:MM:SS.cc`; negative input renders as zero
pub fn format_elapsed(nanos: i64) -> String {
    let centis = nanos.max(0) / NANOS_PER_CENTI;
    let cc = centis % 100;
    let seconds = centis / 100;
    let ss = seconds % 60;
    let minutes = seconds / 60;
    let mm = minutes % 60;
    let hours = minutes / 60;
    format!("{}:{:02}:{:02}.{:02}", hours, mm, ss, cc)
}

pub fn colored_state(state: LifecycleState) -> ColoredString {
    let label = format!("{:<7}", state.as_str());
    match state {
        LifecycleState::New => label.cyan(),
        LifecycleState::Running => label.green().bold(),
        LifecycleState::Paused => label.yellow(),
        LifecycleState::Stopped => label.red(),
    }
}

/// One-line status, e.g. `RUNNING  0:01:02.50`
pub fn status_line(observation: &Observation) -> String {
    format!(
        "{}  {}",
        colored_state(observation.state),
        format_elapsed(observation.elapsed)
    )
}

/// Operations that make sense from `state`, in display order
pub fn available_commands(state: LifecycleState) -> &'static [&'static str] {
    match state {
        LifecycleState::New | LifecycleState::Stopped => &["start"],
        LifecycleState::Running => &["pause", "stop"],
        LifecycleState::Paused => &["resume"],
    }
}
