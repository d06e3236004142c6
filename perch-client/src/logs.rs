//! Step log endpoints

use perch_core::domain::log::LogEntry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::WoodpeckerClient;
use crate::error::Result;

impl WoodpeckerClient {
    /// Get all log entries of a pipeline step in server order
    ///
    /// Payloads are returned still encoded; see [`LogEntry::decode`].
    pub async fn step_logs(
        &self,
        repo_id: i64,
        number: i64,
        step_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogEntry>> {
        let url = format!(
            "{}/api/repos/{}/logs/{}/{}",
            self.base_url, repo_id, number, step_id
        );

        let entries: Vec<LogEntry> = self
            .execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, pipeline_num = number, step_id, error = %e, "Failed to get step logs");
                e.with_context(format!(
                    "failed to get logs for step {} in pipeline {} for repo {}",
                    step_id, number, repo_id
                ))
            })?;

        debug!(repo_id, pipeline_num = number, step_id, count = entries.len(), "Fetched step logs");
        Ok(entries)
    }
}
