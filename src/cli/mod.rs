//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Extract Jira issues and changelogs into tagged CSV snapshots
#[derive(Parser, Debug)]
#[command(name = "jsnap", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project config file (default: ./jsnap.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the extraction pipeline and write CSV artifacts
    Extract(ExtractArgs),

    /// Print the tracker's field-name map
    Fields(FieldsArgs),

    /// Normalize sprint labels (e.g. "Board Sprint 14.2" -> "sprint 14.2")
    Sprint(SprintArgs),

    /// Show resolved configuration (API token redacted)
    Config,

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExtractArgs {
    /// JQL query (ignored when teams are given)
    #[arg(long)]
    pub query: Option<String>,

    /// Team label to query; repeat for fan-out
    #[arg(long = "team", value_name = "TEAM")]
    pub teams: Vec<String>,

    /// Maximum issues per query
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Replay a recorded snapshot instead of calling Jira
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Record tracker responses to a snapshot file
    #[arg(long, value_name = "FILE", conflicts_with = "snapshot")]
    pub record: Option<PathBuf>,

    /// Stop after writing the raw issue and changelog tables
    #[arg(long)]
    pub raw_only: bool,

    /// Directory for raw tables
    #[arg(long, value_name = "DIR")]
    pub data_raw: Option<PathBuf>,

    /// Directory for the processed table
    #[arg(long, value_name = "DIR")]
    pub data_process: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FieldsArgs {
    /// Read fields from a recorded snapshot instead of calling Jira
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SprintArgs {
    /// Sprint display names
    #[arg(required = true)]
    pub labels: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}
