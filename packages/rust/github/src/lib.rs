//! GitHub REST adapter: list a user's repositories and fetch README text.
//!
//! Only the two read endpoints the article pipeline needs are covered.
//! README failures are never fatal; the caller falls back to the description.

use std::time::Duration;

use chrono::{DateTime, Utc};
use devlog_shared::{DevlogError, RepositoryRecord, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Repositories requested per page (API maximum).
const PER_PAGE: usize = 100;

/// Default timeout in seconds for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Media type returning the README body as raw text.
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

/// Media type for JSON listings.
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// User-Agent string (GitHub rejects requests without one).
const USER_AGENT: &str = concat!("devlog/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubOptions {
    /// API base URL, e.g. `https://api.github.com`.
    pub api_url: String,
    /// Account whose public repositories are listed.
    pub username: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Upper bound on repositories returned by [`GitHubClient::list_repositories`].
    pub max_repositories: usize,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl GitHubOptions {
    pub fn new(api_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            username: username.into(),
            token: None,
            max_repositories: 10,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: String,
    description: Option<String>,
    #[serde(default)]
    html_url: String,
    pushed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
}

impl ApiRepository {
    fn into_record(self) -> RepositoryRecord {
        // Empty repositories report no push; fall back to the last metadata update.
        let pushed_at = self
            .pushed_at
            .or(self.updated_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| RepositoryRecord::NO_DESCRIPTION.to_string());

        RepositoryRecord {
            name: self.name,
            description,
            readme_text: String::new(),
            pushed_at,
            html_url: self.html_url,
            stars: self.stargazers_count,
            forks: self.forks_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin client over the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base: String,
    opts: GitHubOptions,
}

impl GitHubClient {
    pub fn new(opts: GitHubOptions) -> Result<Self> {
        let http = build_client(&opts)?;
        let base = opts.api_url.trim_end_matches('/').to_string();
        Url::parse(&base)
            .map_err(|e| DevlogError::config(format!("invalid GitHub API URL {base}: {e}")))?;
        Ok(Self { http, base, opts })
    }

    /// List the user's repositories page by page, stopping at an empty page
    /// or once `max_repositories` have been collected.
    #[instrument(skip_all, fields(user = %self.opts.username))]
    pub async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let mut records = Vec::new();
        let mut page = 1usize;

        while records.len() < self.opts.max_repositories {
            let mut url = self.endpoint(&format!("users/{}/repos", self.opts.username))?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            debug!(%url, page, "fetching repository page");
            let response = self
                .authorized(self.http.get(url.as_str()))
                .header(ACCEPT, JSON_MEDIA_TYPE)
                .send()
                .await
                .map_err(|e| DevlogError::Network(format!("{url}: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DevlogError::Network(format!("{url}: HTTP {status}")));
            }

            let batch: Vec<ApiRepository> = response.json().await.map_err(|e| {
                DevlogError::parse(format!("{url}: invalid repository listing: {e}"))
            })?;

            if batch.is_empty() {
                break;
            }
            records.extend(batch.into_iter().map(ApiRepository::into_record));
            page += 1;
        }

        records.truncate(self.opts.max_repositories);
        info!(count = records.len(), "repositories listed");
        Ok(records)
    }

    /// Fetch the README of `repo_name` as raw text. Any failure yields an empty string.
    #[instrument(skip_all, fields(repo = %repo_name))]
    pub async fn fetch_readme(&self, repo_name: &str) -> String {
        match self.try_fetch_readme(repo_name).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "README unavailable");
                String::new()
            }
        }
    }

    async fn try_fetch_readme(&self, repo_name: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/readme",
            self.opts.username, repo_name
        ))?;

        let response = self
            .authorized(self.http.get(url.as_str()))
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| DevlogError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DevlogError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| DevlogError::Network(format!("{url}: failed to read body: {e}")))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base, path);
        Url::parse(&raw).map_err(|e| DevlogError::validation(format!("invalid URL {raw}: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.opts.token {
            Some(token) if !token.is_empty() => {
                request.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            _ => request,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &GitHubOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| DevlogError::Network(format!("failed to build HTTP client: {e}")))
}
