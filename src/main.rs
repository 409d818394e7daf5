use clap::Parser;
use jira_snapshot::cli::commands;
use jira_snapshot::cli::{Cli, Commands};
use jira_snapshot::logging::init_logging;
use jira_snapshot::{SnapshotError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Extract(args) => commands::extract::execute(args, cli.json, cli.quiet, config),
        Commands::Fields(args) => commands::fields::execute(args, cli.json, config),
        Commands::Sprint(args) => commands::sprint::execute(args, cli.json),
        Commands::Config => commands::config::execute(cli.json, config),
        Commands::Version => commands::version::execute(cli.json),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs a human-readable error.
fn handle_error(err: &SnapshotError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
