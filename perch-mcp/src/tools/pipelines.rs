//! Pipeline tools

use perch_core::dto::pipeline::{PipelineOptions, PipelineStartParams};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    Arguments, Dispatcher, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolOutcome,
    ToolResult, ensure_active, repo_params,
};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

fn with_repo(params: impl IntoIterator<Item = ParamSpec>) -> Vec<ParamSpec> {
    repo_params().into_iter().chain(params).collect()
}

pub(super) fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_pipelines",
            description: "List pipelines for a repository",
            params: with_repo([ParamSpec::optional(
                "limit",
                ParamKind::Number,
                "Maximum number of pipelines to return (default: 10, max: 100)",
            )]),
        },
        ToolDescriptor {
            name: "get_pipeline_status",
            description: "Get the status of a specific pipeline",
            params: with_repo([
                ParamSpec::optional(
                    "pipeline_number",
                    ParamKind::Number,
                    "Pipeline number (required if not using 'latest')",
                ),
                ParamSpec::optional(
                    "latest",
                    ParamKind::Boolean,
                    "Get the latest pipeline (default: false)",
                ),
            ]),
        },
        ToolDescriptor {
            name: "start_pipeline",
            description: "Start (restart) a specific pipeline",
            params: with_repo([
                ParamSpec::required(
                    "pipeline_number",
                    ParamKind::Number,
                    "Pipeline number to restart",
                ),
                ParamSpec::optional(
                    "fork",
                    ParamKind::Boolean,
                    "Fork the pipeline (default: false)",
                ),
            ]),
        },
        ToolDescriptor {
            name: "stop_pipeline",
            description: "Stop a running pipeline",
            params: with_repo([ParamSpec::required(
                "pipeline_number",
                ParamKind::Number,
                "Pipeline number to stop",
            )]),
        },
        ToolDescriptor {
            name: "approve_pipeline",
            description: "Approve a pending pipeline",
            params: with_repo([ParamSpec::required(
                "pipeline_number",
                ParamKind::Number,
                "Pipeline number to approve",
            )]),
        },
        ToolDescriptor {
            name: "decline_pipeline",
            description: "Decline a pending pipeline",
            params: with_repo([ParamSpec::required(
                "pipeline_number",
                ParamKind::Number,
                "Pipeline number to decline",
            )]),
        },
        ToolDescriptor {
            name: "trigger_pipeline",
            description: "Trigger a new pipeline for a repository",
            params: with_repo([ParamSpec::optional(
                "branch",
                ParamKind::String,
                "Branch to trigger pipeline for (default: main branch)",
            )]),
        },
    ]
}

/// Clamp a requested page size: above the maximum is capped, below one
/// falls back to the default
fn effective_limit(requested: f64) -> usize {
    let limit = requested as i64;
    let limit = if limit > MAX_LIMIT {
        MAX_LIMIT
    } else if limit < 1 {
        DEFAULT_LIMIT
    } else {
        limit
    };
    limit as usize
}

pub(super) async fn list_pipelines(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;

    let mut pipelines = dispatcher
        .backend
        .list_pipelines(repo_id, cancel)
        .await
        .map_err(ToolError::backend("Failed to list pipelines"))?;

    let limit = effective_limit(args.get_number("limit", DEFAULT_LIMIT as f64));
    let total_count = pipelines.len();
    let limited = total_count > limit;
    pipelines.truncate(limit);

    Ok(ToolResult::json(&json!({
        "repo_id": repo_id,
        "pipelines": pipelines,
        "total_count": total_count,
        "returned": pipelines.len(),
        "limited": limited,
    }))?)
}

pub(super) async fn get_pipeline_status(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;

    let result = if args.get_bool("latest", false) {
        dispatcher.backend.get_last_pipeline(repo_id, cancel).await
    } else {
        let number = args.require_id("pipeline_number").map_err(|_| {
            ToolError::Usage("Either pipeline_number or latest=true must be provided")
        })?;
        dispatcher.backend.get_pipeline(repo_id, number, cancel).await
    };
    let pipeline = result.map_err(ToolError::backend("Failed to get pipeline"))?;

    Ok(ToolResult::json(&pipeline)?)
}

pub(super) async fn start_pipeline(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let number = args.require_id("pipeline_number")?;

    let params = if args.get_bool("fork", false) {
        PipelineStartParams::fork()
    } else {
        PipelineStartParams::default()
    };

    let pipeline = dispatcher
        .backend
        .start_pipeline(repo_id, number, &params, cancel)
        .await
        .map_err(ToolError::backend("Failed to start pipeline"))?;

    Ok(ToolResult::json(&pipeline)?)
}

pub(super) async fn stop_pipeline(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let number = args.require_id("pipeline_number")?;

    dispatcher
        .backend
        .stop_pipeline(repo_id, number, cancel)
        .await
        .map_err(ToolError::backend("Failed to stop pipeline"))?;

    Ok(ToolResult::json(&json!({
        "success": true,
        "message": "Pipeline stopped successfully",
        "repo_id": repo_id,
        "pipeline_number": number,
    }))?)
}

pub(super) async fn approve_pipeline(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let number = args.require_id("pipeline_number")?;

    let pipeline = dispatcher
        .backend
        .approve_pipeline(repo_id, number, cancel)
        .await
        .map_err(ToolError::backend("Failed to approve pipeline"))?;

    Ok(ToolResult::json(&pipeline)?)
}

pub(super) async fn decline_pipeline(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let number = args.require_id("pipeline_number")?;

    let pipeline = dispatcher
        .backend
        .decline_pipeline(repo_id, number, cancel)
        .await
        .map_err(ToolError::backend("Failed to decline pipeline"))?;

    Ok(ToolResult::json(&pipeline)?)
}

pub(super) async fn trigger_pipeline(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let options = PipelineOptions::for_branch(args.get_string("branch", "main"));

    let pipeline = dispatcher
        .backend
        .create_pipeline(repo_id, &options, cancel)
        .await
        .map_err(ToolError::backend("Failed to trigger pipeline"))?;

    info!(repo_id, pipeline_num = pipeline.number, branch = %options.branch, "Triggered pipeline");
    Ok(ToolResult::json(&pipeline)?)
}
