//! Command implementations.

pub mod completions;
pub mod config;
pub mod extract;
pub mod fields;
pub mod sprint;
pub mod version;

use crate::config::{CliOverrides, Settings};
use crate::error::Result;
use crate::source::{JiraClient, JiraCredentials};
use std::path::Path;

/// Build a live client from settings.
///
/// Credentials are attached only when both user and token are set.
pub(crate) fn live_client(settings: &Settings) -> Result<JiraClient> {
    let credentials = match (&settings.jira.user, &settings.jira.api_token) {
        (Some(user), Some(api_token)) => Some(JiraCredentials {
            user: user.clone(),
            api_token: api_token.clone(),
        }),
        _ => None,
    };
    let client = JiraClient::new(
        settings.jira.server.as_deref().unwrap_or_default(),
        credentials,
    )?;
    Ok(client.with_deployment(settings.jira.deployment))
}

/// Overrides carrying only the global `--config` path.
#[must_use]
pub fn base_overrides(config: Option<&Path>) -> CliOverrides {
    CliOverrides {
        config: config.map(Path::to_path_buf),
        ..CliOverrides::default()
    }
}
