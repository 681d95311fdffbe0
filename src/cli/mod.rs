pub mod destroy;
pub mod run;
pub mod status;

use crate::models::ClockIdentity;
use crate::Result;
use anyhow::Context;

/// Parse a clock identity given on the command line
pub fn parse_identity(text: &str) -> Result<ClockIdentity> {
    text.trim()
        .parse::<ClockIdentity>()
        .with_context(|| format!("'{}' is not a valid clock id (expected a UUID)", text))
}
