//! Pipeline domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One execution run of a repository's workflow definition
///
/// `number` is sequential per repository and is what every pipeline endpoint
/// is addressed by; `id` is the backend's global row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub id: i64,
    pub number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<i64>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Commit, author, timestamps, workflows and whatever else the backend sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
