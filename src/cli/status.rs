use crate::cli::parse_identity;
use crate::config::ClockConfig;
use crate::display::{colored_state, format_elapsed};
use crate::models::{wall_clock_nanos, ClockIdentity, Observation, PersistedRecord};
use crate::Result;
use anyhow::Context;
use chrono::{Local, TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;

/// Machine-readable status report
#[derive(Debug, Serialize)]
struct StatusReport {
    id: ClockIdentity,
    /// `state` and `elapsed` (nanoseconds)
    #[serde(flatten)]
    current: Observation,
    elapsed_text: String,
    saved_at: String,
}

impl StatusReport {
    fn new(id: ClockIdentity, record: &PersistedRecord, now_wall: i64) -> Self {
        let elapsed = record.projected_elapsed(now_wall);
        Self {
            id,
            current: Observation {
                state: record.state,
                elapsed,
            },
            elapsed_text: format_elapsed(elapsed),
            saved_at: Utc.timestamp_nanos(record.wall_clock_save_time).to_rfc3339(),
        }
    }
}

/// Print the committed state of a clock without opening it
pub fn run(id: &str, json: bool, config: &ClockConfig) -> Result<()> {
    let clock_id = parse_identity(id)?;
    let store = config.store();

    let record = store
        .peek(&clock_id)
        .with_context(|| format!("Failed to read state of clock {}", clock_id))?;

    let Some(record) = record else {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "clock_not_found", "id": id })
            );
        } else {
            println!("{}", format!("Clock '{}' not found", id).red());
        }
        return Ok(());
    };

    let report = StatusReport::new(clock_id, &record, wall_clock_nanos());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format!("Status for: {}", clock_id).cyan().bold());
        println!();
        println!("   State:     {}", colored_state(record.state));
        println!("   Elapsed:   {}", report.elapsed_text);
        println!(
            "   Saved:     {}",
            Local
                .timestamp_nanos(record.wall_clock_save_time)
                .format("%Y-%m-%d %H:%M:%S")
        );
        println!("   Location:  {}", store.dir().display());
    }

    Ok(())
}
