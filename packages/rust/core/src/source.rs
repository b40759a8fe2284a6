//! Where repositories come from.

use async_trait::async_trait;
use devlog_github::GitHubClient;
use devlog_shared::{RepositoryRecord, Result};

/// Lists candidate repositories and supplies README text on demand.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>>;

    /// README text, or an empty string when unavailable.
    async fn fetch_readme(&self, repo: &RepositoryRecord) -> String;
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        GitHubClient::list_repositories(self).await
    }

    async fn fetch_readme(&self, repo: &RepositoryRecord) -> String {
        GitHubClient::fetch_readme(self, &repo.name).await
    }
}
