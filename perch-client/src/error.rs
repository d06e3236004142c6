//! Error types for the Woodpecker client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Woodpecker client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client was constructed with missing or malformed settings
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The caller gave up while waiting for admission
    #[error("request cancelled")]
    Cancelled,

    /// An operation failed; `context` names the ids involved
    #[error("{context}: {source}")]
    Operation {
        context: String,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Wrap this error with a description of the failed operation
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping operation context
    pub fn root(&self) -> &ClientError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.root(), Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.root(), Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if the request was abandoned through its cancellation token
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}
