//! Repository domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A repository known to the CI backend
///
/// `id` is the canonical, backend-assigned identifier. `full_name` is the
/// "owner/name" form accepted by the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub id: i64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub active: bool,
    /// Remaining backend fields (forge URLs, visibility, trust flags, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Repo {
    /// Whether the repository is activated in the CI backend
    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": 7,
            "owner": "acme",
            "name": "widgets",
            "full_name": "acme/widgets",
            "active": true,
            "default_branch": "main",
            "trusted": { "network": false }
        });

        let repo: Repo = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(repo.id, 7);
        assert!(repo.is_active());
        assert_eq!(repo.extra.get("default_branch"), Some(&Value::from("main")));

        let back = serde_json::to_value(&repo).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_repo_active_defaults_to_false() {
        let repo: Repo = serde_json::from_value(serde_json::json!({
            "id": 1,
            "full_name": "acme/legacy"
        }))
        .unwrap();

        assert!(!repo.is_active());
        assert!(repo.owner.is_empty());
    }
}
