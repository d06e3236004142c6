//! Repository-related API endpoints

use perch_core::domain::repo::Repo;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::WoodpeckerClient;
use crate::error::Result;

impl WoodpeckerClient {
    // =============================================================================
    // Repository Query
    // =============================================================================

    /// List all repositories accessible to the authenticated user
    ///
    /// Inactive repositories are included; filtering is left to the caller.
    pub async fn list_repositories(&self, cancel: &CancellationToken) -> Result<Vec<Repo>> {
        let url = format!("{}/api/user/repos", self.base_url);

        let repos: Vec<Repo> = self
            .execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list repositories");
                e.with_context("failed to list repositories")
            })?;

        debug!(count = repos.len(), "Listed repositories");
        Ok(repos)
    }

    /// Get a repository by its numeric ID
    pub async fn get_repository(&self, repo_id: i64, cancel: &CancellationToken) -> Result<Repo> {
        let url = format!("{}/api/repos/{}", self.base_url, repo_id);

        self.execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, error = %e, "Failed to get repository");
                e.with_context(format!("failed to get repository {}", repo_id))
            })
    }

    /// Look up a repository by its full name
    ///
    /// # Arguments
    /// * `full_name` - The "owner/name" form of the repository
    pub async fn lookup_repository(
        &self,
        full_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Repo> {
        let url = format!("{}/api/repos/lookup/{}", self.base_url, full_name);

        self.execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_name = full_name, error = %e, "Failed to lookup repository");
                e.with_context(format!("failed to lookup repository {}", full_name))
            })
    }
}
