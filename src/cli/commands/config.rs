//! Config command: show the resolved settings.

use super::base_overrides;
use crate::config;
use crate::error::Result;
use std::path::Path;

/// Execute the config command.
///
/// The API token is always redacted.
///
/// # Errors
///
/// Returns an error if a config file is unreadable or a setting is invalid.
pub fn execute(json: bool, config: Option<&Path>) -> Result<()> {
    let settings = config::load_settings(&base_overrides(config))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        return Ok(());
    }

    for (key, value) in settings.entries() {
        println!("{key} = {value}");
    }
    Ok(())
}
