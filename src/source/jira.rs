//! Jira REST client (blocking).
//!
//! Endpoints differ by [`Deployment`].
//!
//! Cloud:
//! - `GET /rest/api/3/search/jql` (paged by `nextPageToken`)
//! - `GET /rest/api/2/issue/{key}/changelog` (paged by `startAt`)
//!
//! Server / Data Center:
//! - `GET /rest/api/2/search` (paged by `startAt`)
//! - `GET /rest/api/2/issue/{key}?expand=changelog`
//!
//! Both use `GET /rest/api/2/field` for the field-name map.

use super::QueryExecutor;
use crate::error::{Result, SnapshotError};
use crate::model::{FieldDef, RawHistory, RawIssue};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Jira never returns more than this many issues per search page.
const PAGE_LIMIT: usize = 100;

/// Changelog entries requested per page.
const CHANGELOG_PAGE_LIMIT: usize = 100;

/// Which REST surface the site exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Jira Cloud (`*.atlassian.net`).
    #[default]
    Cloud,
    /// Self-hosted Jira Server or Data Center.
    Server,
}

impl Deployment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Server => "server",
        }
    }

    /// Parse a config value; `datacenter` and `data-center` mean `Server`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cloud" => Some(Self::Cloud),
            "server" | "datacenter" | "data-center" => Some(Self::Server),
            _ => None,
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic-auth credentials: account email plus API token.
#[derive(Clone)]
pub struct JiraCredentials {
    pub user: String,
    pub api_token: String,
}

impl fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("user", &self.user)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Blocking HTTP client for one Jira site.
pub struct JiraClient {
    client: Client,
    server: String,
    credentials: Option<JiraCredentials>,
    deployment: Deployment,
}

/// `/rest/api/2/search` page.
#[derive(Debug, Deserialize)]
struct OffsetSearchPage {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    issues: Vec<RawIssue>,
}

/// `/rest/api/3/search/jql` page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSearchPage {
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: Option<bool>,
}

/// `/rest/api/2/issue/{key}/changelog` page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangelogPage {
    #[serde(default)]
    values: Vec<RawHistory>,
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    is_last: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct IssueWithChangelog {
    #[serde(default)]
    changelog: Option<EmbeddedChangelog>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedChangelog {
    #[serde(default)]
    histories: Vec<RawHistory>,
    #[serde(default)]
    total: Option<usize>,
}

impl JiraClient {
    /// Create a client for `server` (e.g. `https://example.atlassian.net`).
    ///
    /// # Errors
    ///
    /// Returns a validation error if `server` is empty, or a transport error if
    /// the HTTP client cannot be built.
    pub fn new(server: &str, credentials: Option<JiraCredentials>) -> Result<Self> {
        let server = server.trim().trim_end_matches('/').to_string();
        if server.is_empty() {
            return Err(SnapshotError::validation(
                "jira.server",
                "required for live extraction (or pass --snapshot)",
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("jsnap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            server,
            credentials,
            deployment: Deployment::default(),
        })
    }

    #[must_use]
    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = deployment;
        self
    }

    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    #[must_use]
    pub const fn deployment(&self) -> Deployment {
        self.deployment
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.server);
        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/json");
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.api_token));
        }

        debug!(url = %url, "GET");
        let response = request.send()?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SnapshotError::Auth {
                status: status.as_u16(),
                url,
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SnapshotError::Api {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Ok(response.json()?)
    }

    /// Cloud search: follow `nextPageToken` until the last page or the cap.
    fn search_by_token(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        let mut issues: Vec<RawIssue> = Vec::new();
        let mut token: Option<String> = None;

        while issues.len() < max_results {
            let page_size = (max_results - issues.len()).min(PAGE_LIMIT);
            let mut query = vec![
                ("jql", jql.to_string()),
                ("maxResults", page_size.to_string()),
                ("fields", "*all".to_string()),
            ];
            if let Some(token) = &token {
                query.push(("nextPageToken", token.clone()));
            }

            let page: TokenSearchPage = self.get("/rest/api/3/search/jql", &query)?;
            let received = page.issues.len();
            issues.extend(page.issues);

            let more = received > 0 && page.is_last != Some(true);
            let Some(next) = page.next_page_token.filter(|_| more) else {
                break;
            };
            token = Some(next);
        }

        Ok(issues)
    }

    /// Server search: advance `startAt` by what each page actually held.
    ///
    /// A page shorter than requested is not the end; the server may cap pages.
    fn search_by_offset(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        let mut issues: Vec<RawIssue> = Vec::new();

        while issues.len() < max_results {
            let page_size = (max_results - issues.len()).min(PAGE_LIMIT);
            let page: OffsetSearchPage = self.get(
                "/rest/api/2/search",
                &[
                    ("jql", jql.to_string()),
                    ("startAt", issues.len().to_string()),
                    ("maxResults", page_size.to_string()),
                    ("fields", "*all".to_string()),
                ],
            )?;

            let received = page.issues.len();
            issues.extend(page.issues);

            let exhausted = page.total.is_some_and(|total| issues.len() >= total);
            if received == 0 || exhausted {
                break;
            }
        }

        Ok(issues)
    }

    fn paged_changelog(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        let mut histories: Vec<RawHistory> = Vec::new();
        let path = format!("/rest/api/2/issue/{issue_key}/changelog");

        loop {
            let page: ChangelogPage = self.get(
                &path,
                &[
                    ("startAt", histories.len().to_string()),
                    ("maxResults", CHANGELOG_PAGE_LIMIT.to_string()),
                ],
            )?;

            let received = page.values.len();
            histories.extend(page.values);

            let exhausted = page.total.is_some_and(|total| histories.len() >= total);
            if received == 0 || exhausted || page.is_last == Some(true) {
                break;
            }
        }

        Ok(histories)
    }

    fn embedded_changelog(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        let issue: IssueWithChangelog = self.get(
            &format!("/rest/api/2/issue/{issue_key}"),
            &[
                ("expand", "changelog".to_string()),
                ("fields", "key".to_string()),
            ],
        )?;
        let Some(changelog) = issue.changelog else {
            return Ok(Vec::new());
        };

        if let Some(total) = changelog.total.filter(|&t| t > changelog.histories.len()) {
            warn!(
                key = issue_key,
                total,
                received = changelog.histories.len(),
                "Server truncated the embedded changelog; older entries are missing"
            );
        }
        Ok(changelog.histories)
    }
}

impl QueryExecutor for JiraClient {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        let mut issues = match self.deployment {
            Deployment::Cloud => self.search_by_token(jql, max_results)?,
            Deployment::Server => self.search_by_offset(jql, max_results)?,
        };

        issues.truncate(max_results);
        info!(jql, count = issues.len(), deployment = %self.deployment, "Search complete");
        Ok(issues)
    }

    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        match self.deployment {
            Deployment::Cloud => self.paged_changelog(issue_key),
            Deployment::Server => self.embedded_changelog(issue_key),
        }
    }

    fn field_name_map(&self) -> Result<HashMap<String, String>> {
        let fields: Vec<FieldDef> = self.get("/rest/api/2/field", &[])?;
        Ok(field_map_from_defs(fields))
    }
}

/// Build the name → id map. On duplicate names the later definition wins.
pub(crate) fn field_map_from_defs(fields: Vec<FieldDef>) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(fields.len());
    for field in fields {
        if let Some(previous) = map.insert(field.name.clone(), field.id.clone()) {
            debug!(
                name = %field.name,
                previous = %previous,
                id = %field.id,
                "Duplicate field name"
            );
        }
    }
    map
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("server", &self.server)
            .field("deployment", &self.deployment)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
