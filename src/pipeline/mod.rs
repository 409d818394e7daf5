//! Pipeline driver.
//!
//! Runs `fetch → flatten → enrich → persist` against any [`QueryExecutor`].
//! The raw issue and changelog tables are persisted as soon as flattening
//! finishes, so a failure during enrichment still leaves them on disk.

use crate::config::Settings;
use crate::error::{Result, SnapshotError};
use crate::extract::{FieldResolver, concat_histories, flatten_history, issues::flatten_issue};
use crate::format::csv::write_table_file;
use crate::model::{HistoryRow, IssueRow, RawIssue};
use crate::source::QueryExecutor;
use crate::table::{Cell, Table};
use crate::tagging::expand_and_tag;
use crate::util::progress::ProgressTracker;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

pub const RAW_ISSUES_FILENAME: &str = "raw_data.csv";
pub const RAW_CHANGELOG_FILENAME: &str = "raw_changelog.csv";
pub const PROCESSED_FILENAME: &str = "processed_data.csv";

/// Pipeline stage, for logs and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Flatten,
    Enrich,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Flatten => "flatten",
            Self::Enrich => "enrich",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Which issues to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// One free-form JQL query.
    Single { jql: String },
    /// One team-scoped query per team label, concatenated in order.
    Teams { teams: Vec<String> },
}

impl QueryPlan {
    /// A non-empty team list replaces the free-form query.
    ///
    /// # Errors
    ///
    /// Returns a validation error if neither a query nor teams are given.
    pub fn new(query: Option<&str>, teams: &[String]) -> Result<Self> {
        if !teams.is_empty() {
            return Ok(Self::Teams {
                teams: teams.to_vec(),
            });
        }
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(jql) => Ok(Self::Single {
                jql: jql.to_string(),
            }),
            None => Err(SnapshotError::validation(
                "jira.query",
                "set jira.query (or --query) or at least one team",
            )),
        }
    }
}

/// JQL for one team: `"<field>" = "<team>" AND created >= <floor> order by created DESC`.
#[must_use]
pub fn team_jql(team_field: &str, team: &str, created_floor: &str) -> String {
    format!(
        "\"{}\" = \"{}\" AND created >= {created_floor} order by created DESC",
        escape_jql(team_field),
        escape_jql(team)
    )
}

fn escape_jql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Where the three CSV artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub data_raw: PathBuf,
    pub data_process: PathBuf,
}

impl ArtifactPaths {
    #[must_use]
    pub fn raw_issues(&self) -> PathBuf {
        self.data_raw.join(RAW_ISSUES_FILENAME)
    }

    #[must_use]
    pub fn raw_changelog(&self) -> PathBuf {
        self.data_raw.join(RAW_CHANGELOG_FILENAME)
    }

    #[must_use]
    pub fn processed(&self) -> PathBuf {
        self.data_process.join(PROCESSED_FILENAME)
    }
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub plan: QueryPlan,
    pub max_results: usize,
    pub team_field: String,
    pub created_floor: String,
    pub paths: ArtifactPaths,
    /// Text written for missing cells.
    pub missing: String,
    pub date_columns: Vec<String>,
    pub drop_columns: Vec<String>,
    pub label: String,
    /// Stop after the raw tables are persisted.
    pub raw_only: bool,
    pub show_progress: bool,
}

impl RunRequest {
    /// Build a request from validated settings.
    ///
    /// # Errors
    ///
    /// Returns a validation error if neither a query nor teams are configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            plan: QueryPlan::new(settings.jira.query.as_deref(), &settings.jira.teams)?,
            max_results: settings.jira.max_results,
            team_field: settings.jira.team_field.clone(),
            created_floor: settings.jira.created_floor.clone(),
            paths: ArtifactPaths {
                data_raw: settings.location.data_raw.clone(),
                data_process: settings.location.data_process.clone(),
            },
            missing: settings.process.missing.clone(),
            date_columns: settings.jira.date_columns.clone(),
            drop_columns: settings.process.drop_columns.clone(),
            label: settings.process.label.clone(),
            raw_only: false,
            show_progress: false,
        })
    }
}

/// Issue count of one team query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamCount {
    pub team: String,
    pub issues: usize,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub issues: usize,
    pub changelog_rows: usize,
    /// Rows of the processed table; `None` for raw-only runs.
    pub processed_rows: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<TeamCount>,
    pub label: String,
    /// Processed rows whose label cell is affirmative.
    pub label_positive: Option<usize>,
    pub artifacts: Vec<PathBuf>,
    pub last_stage: Stage,
}

/// An issue with the team label of the query that returned it.
struct FetchedIssue {
    issue: RawIssue,
    team: Option<String>,
}

/// Extraction and enrichment run over one executor.
pub struct Pipeline<'a, E: QueryExecutor + ?Sized> {
    executor: &'a E,
}

impl<'a, E: QueryExecutor + ?Sized> Pipeline<'a, E> {
    #[must_use]
    pub const fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Any executor, flattening, enrichment or I/O error aborts the run.
    /// Artifacts written before the failure are left in place.
    pub fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        info!(stage = %Stage::Fetch, plan = ?request.plan, "Starting extraction");
        let field_map = self.executor.field_name_map()?;
        let (fetched, teams) = self.fetch_issues(request)?;
        let histories = self.fetch_histories(&fetched, request.show_progress)?;

        info!(stage = %Stage::Flatten, issues = fetched.len(), "Flattening");
        let resolver = FieldResolver::new(&field_map);
        let issue_rows = fetched
            .iter()
            .map(|f| {
                let mut row = flatten_issue(&f.issue, &resolver)?;
                if let Some(team) = &f.team {
                    row.team = Some(team.clone());
                }
                Ok(row)
            })
            .collect::<Result<Vec<IssueRow>>>()?;
        let history_rows = concat_histories(histories);

        info!(stage = %Stage::Persist, "Persisting raw tables");
        let mut artifacts = persist_raw(&issue_rows, &history_rows, request)?;

        let mut summary = RunSummary {
            issues: issue_rows.len(),
            changelog_rows: history_rows.len(),
            processed_rows: None,
            teams,
            label: request.label.clone(),
            label_positive: None,
            artifacts: Vec::new(),
            last_stage: Stage::Persist,
        };

        if request.raw_only {
            info!("Raw-only run, skipping enrichment");
            summary.artifacts = artifacts;
            return Ok(summary);
        }

        info!(stage = %Stage::Enrich, "Enriching");
        let processed = enrich(&issue_rows, request)?;
        summary.processed_rows = Some(processed.len());
        summary.label_positive = count_affirmative(&processed, &request.label);

        info!(stage = %Stage::Persist, rows = processed.len(), "Persisting processed table");
        let processed_path = request.paths.processed();
        write_table_file(&processed_path, &processed, &request.missing)?;
        artifacts.push(processed_path);

        summary.artifacts = artifacts;
        info!(
            issues = summary.issues,
            changelog_rows = summary.changelog_rows,
            processed_rows = processed.len(),
            "Run complete"
        );
        Ok(summary)
    }

    fn fetch_issues(&self, request: &RunRequest) -> Result<(Vec<FetchedIssue>, Vec<TeamCount>)> {
        let spinner = ProgressTracker::new_spinner("Querying tracker", request.show_progress);
        let result = self.search_plan(request, &spinner);
        spinner.finish_and_clear();
        result
    }

    fn search_plan(
        &self,
        request: &RunRequest,
        spinner: &ProgressTracker,
    ) -> Result<(Vec<FetchedIssue>, Vec<TeamCount>)> {
        match &request.plan {
            QueryPlan::Single { jql } => {
                let issues = self.executor.search(jql, request.max_results)?;
                let fetched = issues
                    .into_iter()
                    .map(|issue| FetchedIssue { issue, team: None })
                    .collect();
                Ok((fetched, Vec::new()))
            }
            QueryPlan::Teams { teams } => {
                let mut fetched = Vec::new();
                let mut counts = Vec::with_capacity(teams.len());
                for team in teams {
                    spinner.set_message(format!("Querying team {team}"));
                    let jql = team_jql(&request.team_field, team, &request.created_floor);
                    let batch = self.executor.search(&jql, request.max_results)?;
                    info!(team = %team, issues = batch.len(), "Fetched team batch");
                    counts.push(TeamCount {
                        team: team.clone(),
                        issues: batch.len(),
                    });
                    fetched.extend(batch.into_iter().map(|issue| FetchedIssue {
                        issue,
                        team: Some(team.clone()),
                    }));
                }
                Ok((fetched, counts))
            }
        }
    }

    fn fetch_histories(
        &self,
        fetched: &[FetchedIssue],
        show: bool,
    ) -> Result<Vec<Vec<HistoryRow>>> {
        let progress = ProgressTracker::with_visibility(
            fetched.len() as u64,
            "Fetching changelogs",
            show,
        );
        let mut batches = Vec::with_capacity(fetched.len());
        for f in fetched {
            let key = &f.issue.key;
            progress.set_message(key);
            let entries = self.executor.fetch_history(key)?;
            batches.push(flatten_history(key, &entries));
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(batches)
    }
}

fn persist_raw(
    issue_rows: &[IssueRow],
    history_rows: &[HistoryRow],
    request: &RunRequest,
) -> Result<Vec<PathBuf>> {
    let issues_path = request.paths.raw_issues();
    let changelog_path = request.paths.raw_changelog();

    write_table_file(&issues_path, &Table::from_records(issue_rows), &request.missing)?;
    write_table_file(
        &changelog_path,
        &Table::from_records(history_rows),
        &request.missing,
    )?;

    Ok(vec![issues_path, changelog_path])
}

/// Expand per sprint, tag, normalize dates and drop configured columns.
///
/// # Errors
///
/// Returns `InvalidDate` if a configured date column holds a non-date.
pub fn enrich(issue_rows: &[IssueRow], request: &RunRequest) -> Result<Table> {
    let tagged = expand_and_tag(issue_rows);
    debug!(
        issues = issue_rows.len(),
        rows = tagged.len(),
        "Expanded to one row per sprint"
    );

    let mut table = Table::from_records(&tagged);
    table.normalize_dates(&request.date_columns)?;
    table.drop_columns(&request.drop_columns);
    Ok(table)
}

fn count_affirmative(table: &Table, column: &str) -> Option<usize> {
    table
        .column(column)
        .map(|cells| cells.into_iter().filter(|c| **c == Cell::Bool(true)).count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_jql_shape() {
        assert_eq!(
            team_jql("Team[Dropdown]", "Team 5 | Avatar", "2023-01-01"),
            concat!(
                "\"Team[Dropdown]\" = \"Team 5 | Avatar\" ",
                "AND created >= 2023-01-01 order by created DESC"
            )
        );
    }

    #[test]
    fn test_team_jql_escapes_quotes() {
        let jql = team_jql("Team", "The \"A\" Team", "-30d");
        assert!(jql.contains("\"The \\\"A\\\" Team\""));
    }

    #[test]
    fn test_teams_replace_query() {
        let plan = QueryPlan::new(Some("project = LMS"), &["Alpha".to_string()]).unwrap();
        assert_eq!(
            plan,
            QueryPlan::Teams {
                teams: vec!["Alpha".to_string()]
            }
        );
    }

    #[test]
    fn test_plan_requires_query_or_teams() {
        assert!(QueryPlan::new(None, &[]).is_err());
        assert!(QueryPlan::new(Some("   "), &[]).is_err());
        assert_eq!(
            QueryPlan::new(Some("project = LMS"), &[]).unwrap(),
            QueryPlan::Single {
                jql: "project = LMS".to_string()
            }
        );
    }

    #[test]
    fn test_artifact_file_names() {
        let paths = ArtifactPaths {
            data_raw: PathBuf::from("out/raw"),
            data_process: PathBuf::from("out/processed"),
        };
        assert_eq!(paths.raw_issues(), PathBuf::from("out/raw/raw_data.csv"));
        assert_eq!(paths.raw_changelog(), PathBuf::from("out/raw/raw_changelog.csv"));
        assert_eq!(paths.processed(), PathBuf::from("out/processed/processed_data.csv"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Enrich.to_string(), "enrich");
    }
}
