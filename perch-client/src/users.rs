//! User-related API endpoints

use perch_core::domain::user::User;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::WoodpeckerClient;
use crate::error::Result;

impl WoodpeckerClient {
    /// Get the user the access token belongs to
    pub async fn current_user(&self, cancel: &CancellationToken) -> Result<User> {
        let url = format!("{}/api/user", self.base_url);

        self.execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to get current user");
                e.with_context("failed to get current user")
            })
    }
}
