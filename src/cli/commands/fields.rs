//! Fields command: print the tracker's field-name map.

use super::{base_overrides, live_client};
use crate::cli::FieldsArgs;
use crate::config;
use crate::error::Result;
use crate::model::FieldDef;
use crate::source::{QueryExecutor, SnapshotExecutor};
use std::collections::HashMap;
use std::path::Path;

/// Execute the fields command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the field list cannot be read.
pub fn execute(args: &FieldsArgs, json: bool, config: Option<&Path>) -> Result<()> {
    let map = match &args.snapshot {
        Some(path) => SnapshotExecutor::from_path(path)?.field_name_map()?,
        None => {
            let settings = config::load_settings(&base_overrides(config))?;
            live_client(&settings)?.field_name_map()?
        }
    };

    let fields = sorted_fields(map);
    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    let width = fields.iter().map(|f| f.name.chars().count()).max().unwrap_or(0);
    for field in &fields {
        println!("{:<width$}  {}", field.name, field.id);
    }
    Ok(())
}

fn sorted_fields(map: HashMap<String, String>) -> Vec<FieldDef> {
    let mut fields: Vec<FieldDef> = map
        .into_iter()
        .map(|(name, id)| FieldDef { id, name })
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}
