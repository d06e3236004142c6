//! Repository tools

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{
    Arguments, Dispatcher, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolOutcome,
    ToolResult, ensure_active, repo_params,
};

pub(super) fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_repositories",
            description: "List all repositories accessible to the authenticated user",
            params: vec![ParamSpec::optional(
                "all",
                ParamKind::Boolean,
                "Include all repositories (default: false, only active repositories)",
            )],
        },
        ToolDescriptor {
            name: "get_repository",
            description: "Get detailed information about a specific repository",
            params: repo_params().to_vec(),
        },
    ]
}

pub(super) async fn list_repositories(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;

    let mut repositories = dispatcher
        .backend
        .list_repositories(cancel)
        .await
        .map_err(ToolError::backend("Failed to list repositories"))?;

    let show_all = args.get_bool("all", false);
    if !show_all {
        repositories.retain(|repo| repo.is_active());
    }

    Ok(ToolResult::json(&json!({
        "repositories": repositories,
        "total_count": repositories.len(),
        "showing_all": show_all,
    }))?)
}

pub(super) async fn get_repository(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;

    let repo = dispatcher
        .backend
        .get_repository(repo_id, cancel)
        .await
        .map_err(ToolError::backend("Failed to get repository"))?;

    Ok(ToolResult::json(&repo)?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::backend::mock::{MockBackend, repo};
    use serde_json::json;
    use std::sync::Arc;

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new().with_repos(vec![
            repo(1, "acme/a", true),
            repo(2, "acme/b", false),
            repo(3, "acme/c", true),
            repo(4, "acme/d", false),
            repo(5, "acme/e", true),
        ]))
    }

    #[tokio::test]
    async fn test_list_repositories_active_only() {
        let result = call(&dispatcher(backend()), "list_repositories", json!({})).await;
        let body = body(&result);

        assert_eq!(body["total_count"], 3);
        assert_eq!(body["showing_all"], false);
        let ids: Vec<i64> = body["repositories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|repo| repo["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_list_repositories_all() {
        let result = call(&dispatcher(backend()), "list_repositories", json!({ "all": true })).await;
        let body = body(&result);

        assert_eq!(body["total_count"], 5);
        assert_eq!(body["showing_all"], true);
    }

    #[tokio::test]
    async fn test_get_repository_by_name() {
        let backend = backend();
        let result = call(
            &dispatcher(backend.clone()),
            "get_repository",
            json!({ "repo_name": "acme/c" }),
        )
        .await;

        assert_eq!(body(&result)["full_name"], "acme/c");
        assert_eq!(backend.calls(), vec!["lookup_repository(acme/c)", "get_repository(3)"]);
    }

    #[tokio::test]
    async fn test_backend_failure_is_error_result() {
        let backend = Arc::new(MockBackend::new().failing(502));
        let result = call(&dispatcher(backend), "list_repositories", json!({})).await;

        assert!(result.is_error);
        assert_eq!(
            result.text_content(),
            "Failed to list repositories: API error (status 502): mock failure"
        );
    }
}
