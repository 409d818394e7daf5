//! Extract command: run the pipeline and print a run summary.

use super::live_client;
use crate::cli::ExtractArgs;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::pipeline::{Pipeline, RunRequest, RunSummary};
use crate::source::{QueryExecutor, RecordingExecutor, SnapshotExecutor};
use crate::util::progress::should_show_progress;
use std::path::Path;
use tracing::info;

/// Execute the extract command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the tracker fails, or an
/// artifact cannot be written.
pub fn execute(args: &ExtractArgs, json: bool, quiet: bool, config: Option<&Path>) -> Result<()> {
    let overrides = CliOverrides {
        config: config.map(Path::to_path_buf),
        query: args.query.clone(),
        teams: args.teams.clone(),
        max_results: args.max_results,
        data_raw: args.data_raw.clone(),
        data_process: args.data_process.clone(),
    };
    let settings = config::load_settings(&overrides)?;

    let mut request = RunRequest::from_settings(&settings)?;
    request.raw_only = args.raw_only;
    request.show_progress = !quiet && !json && should_show_progress();

    let summary = if let Some(path) = &args.snapshot {
        let executor = SnapshotExecutor::from_path(path)?;
        run(&executor, &request)?
    } else {
        let client = live_client(&settings)?;
        if let Some(record_path) = &args.record {
            let recorder = RecordingExecutor::new(client);
            let result = run(&recorder, &request);
            recorder.into_snapshot().save(record_path)?;
            info!(path = %record_path.display(), "Recorded tracker responses");
            result?
        } else {
            run(&client, &request)?
        }
    };

    print_summary(&summary, json, quiet)
}

fn run<E: QueryExecutor>(executor: &E, request: &RunRequest) -> Result<RunSummary> {
    Pipeline::new(executor).run(request)
}

fn print_summary(summary: &RunSummary, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!("Issues:          {}", summary.issues);
    for team in &summary.teams {
        println!("  {:<14} {}", team.team, team.issues);
    }
    println!("Changelog rows:  {}", summary.changelog_rows);
    match summary.processed_rows {
        Some(rows) => println!("Processed rows:  {rows}"),
        None => println!("Processed rows:  skipped (--raw-only)"),
    }
    if let Some(positive) = summary.label_positive {
        println!("Label '{}':  {positive} affirmative", summary.label);
    }
    for path in &summary.artifacts {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
