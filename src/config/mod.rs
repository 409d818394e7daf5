//! Configuration management for `jira_snapshot`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`JSNAP_*`, plus `JIRA_API_TOKEN`, `JIRA_USER`, `JIRA_SERVER`)
//! 3. Project config (`./jsnap.yaml`, or the file passed with `--config`)
//! 4. User config (`~/.config/jsnap/config.yaml`)
//! 5. Defaults
//!
//! Every layer is a flat map of dotted keys (`jira.max-results`). Nested YAML
//! is flattened into that shape and YAML lists are comma-joined. The merged
//! layer is then parsed into typed [`Settings`] and validated in one pass.

use crate::error::{Result, SnapshotError, ValidationError};
use crate::source::Deployment;
use crate::util::time::validate_created_floor;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project config filename, looked up in the working directory.
pub const PROJECT_CONFIG_FILENAME: &str = "jsnap.yaml";

/// Prefix of environment variables that map onto config keys.
const ENV_PREFIX: &str = "JSNAP_";

const REDACTED: &str = "[REDACTED]";

/// Every key the tool understands. Other keys are ignored.
pub const KNOWN_KEYS: &[&str] = &[
    "location.data-raw",
    "location.data-process",
    "location.data-final",
    "process.drop-columns",
    "process.label",
    "process.test-size",
    "process.missing",
    "model.c",
    "model.gamma",
    "jira.server",
    "jira.deployment",
    "jira.user",
    "jira.api-token",
    "jira.query",
    "jira.teams",
    "jira.team-field",
    "jira.created-floor",
    "jira.max-results",
    "jira.date-columns",
];

/// Environment variables the tracker tooling conventionally uses.
const TRACKER_ENV_ALIASES: &[(&str, &str)] = &[
    ("JIRA_SERVER", "jira.server"),
    ("JIRA_USER", "jira.user"),
    ("JIRA_API_TOKEN", "jira.api-token"),
];

/// A flat key/value configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` environment pairs.
    ///
    /// `JSNAP_JIRA_MAX_RESULTS` maps to `jira.max-results`. The tracker
    /// aliases apply first, so an explicit `JSNAP_*` variable wins over them.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut aliases = Self::default();
        let mut prefixed = Self::default();

        for (name, value) in vars {
            if let Some((_, key)) = TRACKER_ENV_ALIASES.iter().find(|(alias, _)| *alias == name) {
                aliases.insert(key, value);
            } else if let Some(stripped) = name.strip_prefix(ENV_PREFIX) {
                match key_for_env(stripped) {
                    Some(key) => prefixed.insert(key, value),
                    None => debug!(variable = %name, "Ignoring unknown config variable"),
                }
            }
        }

        Self::merge_layers(&[aliases, prefixed])
    }

    /// Look up a key (normalized before lookup).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Set a key (normalized before insertion).
    pub fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit project config file; must exist when given.
    pub config: Option<PathBuf>,
    pub query: Option<String>,
    pub teams: Vec<String>,
    pub max_results: Option<usize>,
    pub data_raw: Option<PathBuf>,
    pub data_process: Option<PathBuf>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(query) = &self.query {
            layer.insert("jira.query", query.clone());
        }
        if !self.teams.is_empty() {
            layer.insert("jira.teams", self.teams.join(","));
        }
        if let Some(max_results) = self.max_results {
            layer.insert("jira.max-results", max_results.to_string());
        }
        if let Some(path) = &self.data_raw {
            layer.insert("location.data-raw", path.to_string_lossy().to_string());
        }
        if let Some(path) = &self.data_process {
            layer.insert("location.data-process", path.to_string_lossy().to_string());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    for (key, value) in [
        ("location.data-raw", "data/raw/"),
        ("location.data-process", "data/processed/"),
        ("location.data-final", "data/final/"),
        ("process.drop-columns", ""),
        ("process.label", "ticket-done"),
        ("process.test-size", "0.3"),
        ("process.missing", ""),
        ("model.c", "0.1,1,10,100,1000"),
        ("model.gamma", "1,0.1,0.01,0.001,0.0001"),
        ("jira.deployment", "cloud"),
        ("jira.team-field", "Team[Dropdown]"),
        ("jira.created-floor", "2023-01-01"),
        ("jira.max-results", "100"),
        (
            "jira.date-columns",
            concat!(
                "created datetime,",
                "Release Date (Actual),",
                "Release Date (Estimated - Original),",
                "Release Date (Estimated - Current)"
            ),
        ),
    ] {
        layer.insert(key, value.to_string());
    }
    layer
}

/// Load user config (`~/.config/jsnap/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("jsnap")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load project config: the explicit `--config` file, or `./jsnap.yaml`.
///
/// # Errors
///
/// Returns an error if an explicit file is missing, or a file cannot be parsed.
pub fn load_project_config(explicit: Option<&Path>) -> Result<ConfigLayer> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(SnapshotError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            ConfigLayer::from_yaml(path)
        }
        None => ConfigLayer::from_yaml(Path::new(PROJECT_CONFIG_FILENAME)),
    }
}

/// Load the merged configuration layer with classic precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(cli.config.as_deref())?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Load, merge and validate settings.
///
/// # Errors
///
/// Returns an error if a config file is unreadable or any setting is invalid.
pub fn load_settings(cli: &CliOverrides) -> Result<Settings> {
    let layer = load_config(cli)?;
    Settings::from_layer(&layer)
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocationSettings {
    pub data_raw: PathBuf,
    pub data_process: PathBuf,
    pub data_final: PathBuf,
}

/// Processing parameters for the enriched table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcessSettings {
    pub drop_columns: Vec<String>,
    /// Column downstream training treats as the label.
    pub label: String,
    /// Held-out fraction for downstream training.
    pub test_size: f64,
    /// Text written for missing cells.
    pub missing: String,
}

/// Hyperparameter grid handed to downstream training.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSettings {
    pub c: Vec<f64>,
    pub gamma: Vec<f64>,
}

/// Tracker account and query parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct JiraSettings {
    pub server: Option<String>,
    pub deployment: Deployment,
    pub user: Option<String>,
    pub api_token: Option<String>,
    pub query: Option<String>,
    pub teams: Vec<String>,
    pub team_field: String,
    pub created_floor: String,
    pub max_results: usize,
    pub date_columns: Vec<String>,
}

/// Fully resolved, validated settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub location: LocationSettings,
    pub process: ProcessSettings,
    pub model: ModelSettings,
    pub jira: JiraSettings,
}

impl Settings {
    /// Parse a merged layer into settings, collecting every validation failure.
    ///
    /// # Errors
    ///
    /// Returns `Validation`/`ValidationErrors` listing every invalid key.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let mut errors = Vec::new();
        let mut parser = LayerParser {
            layer,
            errors: &mut errors,
        };

        let location = LocationSettings {
            data_raw: parser.path("location.data-raw"),
            data_process: parser.path("location.data-process"),
            data_final: parser.path("location.data-final"),
        };

        let process = ProcessSettings {
            drop_columns: parser.list("process.drop-columns"),
            label: parser.text("process.label").unwrap_or_default(),
            test_size: parser.non_negative("process.test-size"),
            missing: layer.get("process.missing").unwrap_or_default().to_string(),
        };

        let model = ModelSettings {
            c: parser.non_negative_list("model.c"),
            gamma: parser.non_negative_list("model.gamma"),
        };

        let jira = JiraSettings {
            server: parser.text("jira.server"),
            deployment: parser.deployment("jira.deployment"),
            user: parser.text("jira.user"),
            api_token: parser.text("jira.api-token"),
            query: parser.text("jira.query"),
            teams: parser.list("jira.teams"),
            team_field: parser.required("jira.team-field"),
            created_floor: parser.created_floor("jira.created-floor"),
            max_results: parser.positive("jira.max-results"),
            date_columns: parser.list("jira.date-columns"),
        };

        if process.label.is_empty() {
            errors.push(ValidationError::new("process.label", "must not be empty"));
        } else if process.drop_columns.contains(&process.label) {
            errors.push(ValidationError::new(
                "process.drop-columns",
                format!("must not drop the label column '{}'", process.label),
            ));
        }

        if !errors.is_empty() {
            return Err(SnapshotError::from_validation_errors(errors));
        }

        Ok(Self {
            location,
            process,
            model,
            jira,
        })
    }

    /// A copy safe to print: the API token is replaced by a marker.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.jira.api_token.is_some() {
            copy.jira.api_token = Some(REDACTED.to_string());
        }
        copy
    }

    /// `(key, value)` pairs in [`KNOWN_KEYS`] order, token redacted.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let shown = self.redacted();
        let opt = |value: &Option<String>| value.clone().unwrap_or_default();
        let joined = |values: &[f64]| {
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };

        vec![
            ("location.data-raw", shown.location.data_raw.display().to_string()),
            ("location.data-process", shown.location.data_process.display().to_string()),
            ("location.data-final", shown.location.data_final.display().to_string()),
            ("process.drop-columns", shown.process.drop_columns.join(",")),
            ("process.label", shown.process.label.clone()),
            ("process.test-size", shown.process.test_size.to_string()),
            ("process.missing", shown.process.missing.clone()),
            ("model.c", joined(&shown.model.c)),
            ("model.gamma", joined(&shown.model.gamma)),
            ("jira.server", opt(&shown.jira.server)),
            ("jira.deployment", shown.jira.deployment.to_string()),
            ("jira.user", opt(&shown.jira.user)),
            ("jira.api-token", opt(&shown.jira.api_token)),
            ("jira.query", opt(&shown.jira.query)),
            ("jira.teams", shown.jira.teams.join(",")),
            ("jira.team-field", shown.jira.team_field.clone()),
            ("jira.created-floor", shown.jira.created_floor.clone()),
            ("jira.max-results", shown.jira.max_results.to_string()),
            ("jira.date-columns", shown.jira.date_columns.join(",")),
        ]
    }
}

/// Reads typed values out of a layer, recording failures instead of stopping.
struct LayerParser<'a> {
    layer: &'a ConfigLayer,
    errors: &'a mut Vec<ValidationError>,
}

impl LayerParser<'_> {
    fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.errors.push(ValidationError::new(key, message));
    }

    /// Trimmed, non-empty text.
    fn text(&self, key: &str) -> Option<String> {
        self.layer
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn required(&mut self, key: &str) -> String {
        self.text(key).unwrap_or_else(|| {
            self.fail(key, "must not be empty");
            String::new()
        })
    }

    fn path(&mut self, key: &str) -> PathBuf {
        PathBuf::from(self.required(key))
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.layer
            .get(key)
            .map(split_list)
            .unwrap_or_default()
    }

    fn non_negative(&mut self, key: &str) -> f64 {
        let Some(raw) = self.text(key) else {
            self.fail(key, "must be set");
            return 0.0;
        };
        match raw.parse::<f64>() {
            Ok(value) if value >= 0.0 => value,
            Ok(value) => {
                self.fail(key, format!("must be non-negative (got {value})"));
                0.0
            }
            Err(_) => {
                self.fail(key, format!("not a number: '{raw}'"));
                0.0
            }
        }
    }

    fn non_negative_list(&mut self, key: &str) -> Vec<f64> {
        let mut values = Vec::new();
        for item in self.list(key) {
            match item.parse::<f64>() {
                Ok(value) if value >= 0.0 => values.push(value),
                Ok(value) => self.fail(key, format!("must be non-negative (got {value})")),
                Err(_) => self.fail(key, format!("not a number: '{item}'")),
            }
        }
        values
    }

    fn positive(&mut self, key: &str) -> usize {
        let raw = self.required(key);
        match raw.parse::<usize>() {
            Ok(value) if value > 0 => value,
            Ok(_) => {
                self.fail(key, "must be greater than zero");
                0
            }
            Err(_) if raw.is_empty() => 0,
            Err(_) => {
                self.fail(key, format!("not a whole number: '{raw}'"));
                0
            }
        }
    }

    fn deployment(&mut self, key: &str) -> Deployment {
        let raw = self.required(key);
        if raw.is_empty() {
            return Deployment::default();
        }
        Deployment::parse(&raw).unwrap_or_else(|| {
            self.fail(key, format!("expected 'cloud' or 'server' (got '{raw}')"));
            Deployment::default()
        })
    }

    fn created_floor(&mut self, key: &str) -> String {
        let raw = self.required(key);
        if raw.is_empty() {
            return raw;
        }
        match validate_created_floor(&raw, key) {
            Ok(floor) => floor,
            Err(SnapshotError::Validation { reason, .. }) => {
                self.fail(key, reason);
                raw
            }
            Err(other) => {
                self.fail(key, other.to_string());
                raw
            }
        }
    }
}

/// Split a comma-joined list, dropping blank items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

/// Map the part of an env variable after the prefix onto a known key.
///
/// `JIRA_MAX_RESULTS` and `jira_max_results` both resolve to `jira.max-results`.
fn key_for_env(raw: &str) -> Option<&'static str> {
    let wanted = normalize_key(raw);
    KNOWN_KEYS
        .iter()
        .copied()
        .find(|key| key.replace('.', "-") == wanted)
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
