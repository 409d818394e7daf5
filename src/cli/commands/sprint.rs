//! Sprint command: normalize sprint labels.

use crate::cli::SprintArgs;
use crate::error::Result;
use crate::tagging::get_sprint;
use serde::Serialize;

#[derive(Serialize)]
struct SprintOutput<'a> {
    label: &'a str,
    sprint: Option<String>,
}

/// Execute the sprint command.
///
/// Labels without a sprint number print as an empty line (JSON `null`).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &SprintArgs, json: bool) -> Result<()> {
    let outputs: Vec<SprintOutput<'_>> = args
        .labels
        .iter()
        .map(|label| SprintOutput {
            label,
            sprint: get_sprint(label),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(());
    }

    for output in &outputs {
        println!("{}", output.sprint.as_deref().unwrap_or_default());
    }
    Ok(())
}
