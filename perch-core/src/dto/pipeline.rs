//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body for creating a new pipeline run on a branch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub branch: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

impl PipelineOptions {
    /// Options for a run on `branch` with no extra variables
    pub fn for_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            variables: BTreeMap::new(),
        }
    }
}

/// Query parameters for restarting an existing pipeline
///
/// Sent as the query string of the restart request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStartParams(pub BTreeMap<String, String>);

impl PipelineStartParams {
    /// Parameters requesting a forked restart
    pub fn fork() -> Self {
        let mut params = BTreeMap::new();
        params.insert("fork".to_string(), "true".to_string());
        Self(params)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_options_omit_empty_variables() {
        let body = serde_json::to_value(PipelineOptions::for_branch("main")).unwrap();
        assert_eq!(body, serde_json::json!({ "branch": "main" }));
    }

    #[test]
    fn test_fork_params() {
        let params = PipelineStartParams::fork();
        assert_eq!(params.0.get("fork").map(String::as_str), Some("true"));
        assert!(PipelineStartParams::default().is_empty());
    }
}
