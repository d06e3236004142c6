//! Perch HTTP Client
//!
//! A type-safe, rate-limited HTTP client for the Woodpecker CI API.
//!
//! Every operation waits for admission from a shared [`RateLimiter`], attaches
//! the bearer token, and wraps failures with the ids it was working on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use perch_client::{ClientConfig, TokenBucket, WoodpeckerClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> perch_client::Result<()> {
//!     let client = WoodpeckerClient::connect(
//!         ClientConfig::new("https://ci.example.com", "token"),
//!         Arc::new(TokenBucket::default()),
//!     )
//!     .await?;
//!
//!     let repos = client.list_repositories(&CancellationToken::new()).await?;
//!     println!("{} repositories", repos.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod limiter;
mod logs;
mod pipelines;
mod repos;
mod users;

pub use error::{ClientError, Result};
pub use limiter::{RateLimiter, TokenBucket, Unlimited};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Overall timeout applied to every request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Woodpecker server
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the server (e.g., "https://ci.example.com")
    pub url: String,
    /// Personal access token sent as a bearer token
    pub token: String,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// HTTP client for the Woodpecker CI API
///
/// Operations are organized into logical groups:
/// - Repositories (list, get, lookup by full name)
/// - Pipelines (list, get, latest, restart, stop, approve, decline, create)
/// - Step logs
/// - Current user
///
/// Cloning is cheap; clones share the connection pool and the rate limiter.
#[derive(Debug, Clone)]
pub struct WoodpeckerClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client with auth header and timeout preconfigured
    client: Client,
    /// Admission gate shared by every operation
    limiter: Arc<dyn RateLimiter>,
}

impl WoodpeckerClient {
    /// Create a client and verify it can reach the server
    ///
    /// Fails with [`ClientError::Config`] if the URL or token is empty, and
    /// with the probe's error (wrapped) if fetching the current user fails.
    pub async fn connect(config: ClientConfig, limiter: Arc<dyn RateLimiter>) -> Result<Self> {
        let client = Self::build(config, limiter)?;

        client
            .current_user(&CancellationToken::new())
            .await
            .map_err(|e| e.with_context("failed to connect to Woodpecker server"))?;

        info!(url = %client.base_url, "Successfully connected to Woodpecker CI server");
        Ok(client)
    }

    fn build(config: ClientConfig, limiter: Arc<dyn RateLimiter>) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ClientError::Config("woodpecker URL is required".to_string()));
        }
        if config.token.trim().is_empty() {
            return Err(ClientError::Config("woodpecker token is required".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
            .map_err(|e| ClientError::Config(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            client,
            limiter,
        })
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Request Execution
    // =============================================================================

    /// Wait for admission, send the request and deserialize the JSON body
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T> {
        self.limiter.acquire(cancel).await?;
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Wait for admission and send a request whose response body is ignored
    async fn execute_empty(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.limiter.acquire(cancel).await?;
        let response = request.send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text.trim()));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    ///
    /// This method checks the status code and returns an error if the request failed.
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text.trim()));
        }

        Ok(())
    }
}
