//! Pipeline-related API endpoints

use perch_core::domain::pipeline::Pipeline;
use perch_core::dto::pipeline::{PipelineOptions, PipelineStartParams};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::WoodpeckerClient;
use crate::error::Result;

impl WoodpeckerClient {
    fn pipeline_url(&self, repo_id: i64, number: i64) -> String {
        format!("{}/api/repos/{}/pipelines/{}", self.base_url, repo_id, number)
    }

    // =============================================================================
    // Pipeline Query
    // =============================================================================

    /// List the pipelines of a repository, newest first
    pub async fn list_pipelines(
        &self,
        repo_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pipeline>> {
        let url = format!("{}/api/repos/{}/pipelines", self.base_url, repo_id);

        let pipelines: Vec<Pipeline> = self
            .execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, error = %e, "Failed to list pipelines");
                e.with_context(format!("failed to list pipelines for repo {}", repo_id))
            })?;

        debug!(repo_id, count = pipelines.len(), "Listed pipelines");
        Ok(pipelines)
    }

    /// Get a pipeline by its per-repository number
    pub async fn get_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = self.pipeline_url(repo_id, number);

        self.execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, pipeline_num = number, error = %e, "Failed to get pipeline");
                e.with_context(format!("failed to get pipeline {} for repo {}", number, repo_id))
            })
    }

    /// Get the most recent pipeline of a repository
    pub async fn get_last_pipeline(
        &self,
        repo_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = format!("{}/api/repos/{}/pipelines/latest", self.base_url, repo_id);

        self.execute(self.client.get(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, error = %e, "Failed to get latest pipeline");
                e.with_context(format!("failed to get latest pipeline for repo {}", repo_id))
            })
    }

    // =============================================================================
    // Pipeline Control
    // =============================================================================

    /// Restart an existing pipeline
    ///
    /// # Arguments
    /// * `params` - Extra query parameters, e.g. [`PipelineStartParams::fork`]
    ///
    /// # Returns
    /// The newly started pipeline
    pub async fn start_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        params: &PipelineStartParams,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = self.pipeline_url(repo_id, number);
        let mut request = self.client.post(&url);
        if !params.is_empty() {
            request = request.query(&params.0);
        }

        let pipeline: Pipeline = self.execute(request, cancel).await.map_err(|e| {
            error!(repo_id, pipeline_num = number, error = %e, "Failed to restart pipeline");
            e.with_context(format!(
                "failed to restart pipeline {} for repo {}",
                number, repo_id
            ))
        })?;

        info!(repo_id, pipeline_num = number, new_num = pipeline.number, "Restarted pipeline");
        Ok(pipeline)
    }

    /// Cancel a running pipeline
    pub async fn stop_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = format!("{}/cancel", self.pipeline_url(repo_id, number));

        self.execute_empty(self.client.post(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, pipeline_num = number, error = %e, "Failed to stop pipeline");
                e.with_context(format!("failed to stop pipeline {} for repo {}", number, repo_id))
            })?;

        info!(repo_id, pipeline_num = number, "Stopped pipeline");
        Ok(())
    }

    /// Approve a pipeline that is waiting for approval
    pub async fn approve_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = format!("{}/approve", self.pipeline_url(repo_id, number));

        let pipeline = self
            .execute(self.client.post(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, pipeline_num = number, error = %e, "Failed to approve pipeline");
                e.with_context(format!(
                    "failed to approve pipeline {} for repo {}",
                    number, repo_id
                ))
            })?;

        info!(repo_id, pipeline_num = number, "Approved pipeline");
        Ok(pipeline)
    }

    /// Decline a pipeline that is waiting for approval
    pub async fn decline_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = format!("{}/decline", self.pipeline_url(repo_id, number));

        let pipeline = self
            .execute(self.client.post(&url), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, pipeline_num = number, error = %e, "Failed to decline pipeline");
                e.with_context(format!(
                    "failed to decline pipeline {} for repo {}",
                    number, repo_id
                ))
            })?;

        info!(repo_id, pipeline_num = number, "Declined pipeline");
        Ok(pipeline)
    }

    /// Create a new pipeline run (manual event)
    ///
    /// # Example
    /// ```no_run
    /// # use perch_client::WoodpeckerClient;
    /// # use perch_core::dto::pipeline::PipelineOptions;
    /// # use tokio_util::sync::CancellationToken;
    /// # async fn example(client: WoodpeckerClient) -> perch_client::Result<()> {
    /// let pipeline = client
    ///     .create_pipeline(7, &PipelineOptions::for_branch("main"), &CancellationToken::new())
    ///     .await?;
    /// println!("started #{}", pipeline.number);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_pipeline(
        &self,
        repo_id: i64,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        let url = format!("{}/api/repos/{}/pipelines", self.base_url, repo_id);

        let pipeline: Pipeline = self
            .execute(self.client.post(&url).json(options), cancel)
            .await
            .map_err(|e| {
                error!(repo_id, branch = %options.branch, error = %e, "Failed to create pipeline");
                e.with_context(format!(
                    "failed to create pipeline on branch {} for repo {}",
                    options.branch, repo_id
                ))
            })?;

        info!(repo_id, pipeline_num = pipeline.number, branch = %options.branch, "Created pipeline");
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::{ClientConfig, ClientError, TokenBucket, WoodpeckerClient};
    use perch_core::dto::pipeline::{PipelineOptions, PipelineStartParams};
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn pipeline_json(number: i64, status: &str) -> serde_json::Value {
        serde_json::json!({ "id": 100 + number, "number": number, "status": status })
    }

    #[tokio::test]
    async fn test_get_pipeline_and_latest() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/3/pipelines/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(5, "success")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/repos/3/pipelines/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(9, "running")))
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let cancel = CancellationToken::new();

        assert_eq!(client.get_pipeline(3, 5, &cancel).await.unwrap().number, 5);
        let latest = client.get_last_pipeline(3, &cancel).await.unwrap();
        assert_eq!(latest.number, 9);
        assert_eq!(latest.status, "running");
    }

    #[tokio::test]
    async fn test_get_pipeline_error_carries_ids() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/3/pipelines/5"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found\n"))
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let err = client
            .get_pipeline(3, 5, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to get pipeline 5 for repo 3: API error (status 404): Not Found"
        );
    }

    #[tokio::test]
    async fn test_start_pipeline_with_fork() {
        let server = mock_server().await;
        Mock::given(method("POST"))
            .and(path("/api/repos/3/pipelines/5"))
            .and(query_param("fork", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(6, "pending")))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let pipeline = client
            .start_pipeline(3, 5, &PipelineStartParams::fork(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(pipeline.number, 6);
    }

    #[tokio::test]
    async fn test_stop_approve_decline_paths() {
        let server = mock_server().await;
        Mock::given(method("POST"))
            .and(path("/api/repos/3/pipelines/5/cancel"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/repos/3/pipelines/5/approve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(5, "pending")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/repos/3/pipelines/5/decline"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(5, "declined")))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let cancel = CancellationToken::new();

        client.stop_pipeline(3, 5, &cancel).await.unwrap();
        assert_eq!(client.approve_pipeline(3, 5, &cancel).await.unwrap().status, "pending");
        assert_eq!(client.decline_pipeline(3, 5, &cancel).await.unwrap().status, "declined");
    }

    #[tokio::test]
    async fn test_create_pipeline_sends_branch() {
        let server = mock_server().await;
        Mock::given(method("POST"))
            .and(path("/api/repos/3/pipelines"))
            .and(body_json(serde_json::json!({ "branch": "develop" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(pipeline_json(12, "pending")))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let pipeline = client
            .create_pipeline(3, &PipelineOptions::for_branch("develop"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(pipeline.number, 12);
    }

    #[tokio::test]
    async fn test_list_pipelines_cancelled_while_throttled() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/3/pipelines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        // One token, spent by the connection probe.
        let one = NonZeroU32::new(1).unwrap();
        let client = WoodpeckerClient::connect(
            ClientConfig::new(server.uri(), TOKEN),
            Arc::new(TokenBucket::new(one, one)),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.list_pipelines(3, &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(err.root(), ClientError::Cancelled));
    }
}
