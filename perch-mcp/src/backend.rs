//! CI backend seam
//!
//! Handlers talk to the Woodpecker server through [`CiBackend`] so they can be
//! exercised against an in-memory backend in tests.

use async_trait::async_trait;
use perch_client::{Result, WoodpeckerClient};
use perch_core::domain::log::LogEntry;
use perch_core::domain::pipeline::Pipeline;
use perch_core::domain::repo::Repo;
use perch_core::dto::pipeline::{PipelineOptions, PipelineStartParams};
use tokio_util::sync::CancellationToken;

/// Remote operations the tool handlers rely on
#[async_trait]
pub trait CiBackend: Send + Sync {
    async fn list_repositories(&self, cancel: &CancellationToken) -> Result<Vec<Repo>>;

    async fn get_repository(&self, repo_id: i64, cancel: &CancellationToken) -> Result<Repo>;

    async fn lookup_repository(&self, full_name: &str, cancel: &CancellationToken)
    -> Result<Repo>;

    async fn list_pipelines(
        &self,
        repo_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pipeline>>;

    async fn get_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline>;

    async fn get_last_pipeline(&self, repo_id: i64, cancel: &CancellationToken)
    -> Result<Pipeline>;

    async fn start_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        params: &PipelineStartParams,
        cancel: &CancellationToken,
    ) -> Result<Pipeline>;

    async fn stop_pipeline(&self, repo_id: i64, number: i64, cancel: &CancellationToken)
    -> Result<()>;

    async fn approve_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline>;

    async fn decline_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline>;

    async fn create_pipeline(
        &self,
        repo_id: i64,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<Pipeline>;

    async fn step_logs(
        &self,
        repo_id: i64,
        number: i64,
        step_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogEntry>>;
}

#[async_trait]
impl CiBackend for WoodpeckerClient {
    async fn list_repositories(&self, cancel: &CancellationToken) -> Result<Vec<Repo>> {
        WoodpeckerClient::list_repositories(self, cancel).await
    }

    async fn get_repository(&self, repo_id: i64, cancel: &CancellationToken) -> Result<Repo> {
        WoodpeckerClient::get_repository(self, repo_id, cancel).await
    }

    async fn lookup_repository(
        &self,
        full_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Repo> {
        WoodpeckerClient::lookup_repository(self, full_name, cancel).await
    }

    async fn list_pipelines(
        &self,
        repo_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pipeline>> {
        WoodpeckerClient::list_pipelines(self, repo_id, cancel).await
    }

    async fn get_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::get_pipeline(self, repo_id, number, cancel).await
    }

    async fn get_last_pipeline(
        &self,
        repo_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::get_last_pipeline(self, repo_id, cancel).await
    }

    async fn start_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        params: &PipelineStartParams,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::start_pipeline(self, repo_id, number, params, cancel).await
    }

    async fn stop_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        WoodpeckerClient::stop_pipeline(self, repo_id, number, cancel).await
    }

    async fn approve_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::approve_pipeline(self, repo_id, number, cancel).await
    }

    async fn decline_pipeline(
        &self,
        repo_id: i64,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::decline_pipeline(self, repo_id, number, cancel).await
    }

    async fn create_pipeline(
        &self,
        repo_id: i64,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<Pipeline> {
        WoodpeckerClient::create_pipeline(self, repo_id, options, cancel).await
    }

    async fn step_logs(
        &self,
        repo_id: i64,
        number: i64,
        step_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogEntry>> {
        WoodpeckerClient::step_logs(self, repo_id, number, step_id, cancel).await
    }
}
