use crate::cli::parse_identity;
use crate::config::ClockConfig;
use crate::Result;
use anyhow::Context;
use colored::Colorize;

/// Delete every artifact of a clock that is not currently open
pub fn run(id: &str, config: &ClockConfig) -> Result<()> {
    let clock_id = parse_identity(id)?;
    let store = config.store();

    if !store.paths(&clock_id).any_exists() {
        println!("{}", format!("Clock '{}' not found", clock_id).yellow());
        return Ok(());
    }

    store
        .destroy(&clock_id)
        .with_context(|| format!("Failed to delete state of clock {}", clock_id))?;

    println!("{}", format!("Destroyed clock {}", clock_id).green());
    Ok(())
}
