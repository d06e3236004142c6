//! Error types for workflow parsing

use thiserror::Error;

/// Errors that prevent a document from being linted at all
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid YAML
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed but its root is not a mapping
    #[error("workflow root must be a mapping")]
    NotAMapping,
}
