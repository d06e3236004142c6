//! Step log tool
//!
//! Pages and decodes the log lines of a single pipeline step. A line that
//! fails to decode is replaced by an inline marker; the rest of the response
//! is unaffected.

use perch_core::domain::log::LogEntry;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    Arguments, Dispatcher, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolOutcome,
    ToolResult, ensure_active, repo_params,
};

pub(super) fn descriptors() -> Vec<ToolDescriptor> {
    let mut params = repo_params().to_vec();
    params.extend([
        ParamSpec::required("pipeline_number", ParamKind::Number, "Pipeline number"),
        ParamSpec::required("step_id", ParamKind::Number, "Step ID to get logs for"),
        ParamSpec::optional(
            "format",
            ParamKind::String,
            "Output format: 'json' for structured data or 'text' for plain text (default: json)",
        ),
        ParamSpec::optional(
            "lines",
            ParamKind::Number,
            "Number of lines to return (default: all)",
        ),
        ParamSpec::optional(
            "tail",
            ParamKind::Boolean,
            "Return last N lines instead of first N (default: false for head)",
        ),
    ]);

    vec![ToolDescriptor {
        name: "get_logs",
        description: "Get logs for a specific pipeline step",
        params,
    }]
}

/// The slice of entries to return and whether it is shorter than the whole
///
/// `lines <= 0` selects everything.
fn select_lines(entries: &[LogEntry], lines: i64, tail: bool) -> (&[LogEntry], bool) {
    if lines <= 0 || lines as usize >= entries.len() {
        return (entries, false);
    }

    let lines = lines as usize;
    if tail {
        (&entries[entries.len() - lines..], true)
    } else {
        (&entries[..lines], true)
    }
}

pub(super) async fn get_logs(
    dispatcher: &Dispatcher,
    args: &Arguments,
    cancel: &CancellationToken,
) -> ToolOutcome {
    ensure_active(cancel)?;
    let repo_id = dispatcher.repo_id(args, cancel).await?;
    let number = args.require_id("pipeline_number")?;
    let step_id = args.require_id("step_id")?;

    let format = args.get_string("format", "json");
    let lines = args.get_number("lines", 0.0) as i64;
    let tail = args.get_bool("tail", false);

    let entries = dispatcher
        .backend
        .step_logs(repo_id, number, step_id, cancel)
        .await
        .map_err(ToolError::backend("Failed to get logs"))?;

    let total_count = entries.len();
    let (selected, limited) = select_lines(&entries, lines, tail);
    debug!(repo_id, pipeline_num = number, step_id, total_count, returned = selected.len(), "Fetched logs");

    if format == "text" {
        let text: Vec<String> = selected
            .iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .decode()
                    .unwrap_or_else(|e| format!("[Error decoding log: {}]", e))
            })
            .collect();

        let header = if limited {
            let direction = if tail { "last" } else { "first" };
            format!(
                "Logs for repo {}, pipeline {}, step {} ({} {} of {} lines):",
                repo_id,
                number,
                step_id,
                direction,
                selected.len(),
                total_count
            )
        } else {
            format!("Logs for repo {}, pipeline {}, step {}:", repo_id, number, step_id)
        };

        return Ok(ToolResult::text(format!("{}\n{}", header, text.join("\n"))));
    }

    let logs: Vec<_> = selected
        .iter()
        .map(|entry| {
            let data = if entry.is_empty() {
                String::new()
            } else {
                entry
                    .decode()
                    .unwrap_or_else(|e| format!("[Error decoding: {}]", e))
            };
            json!({ "line": entry.line, "data": data })
        })
        .collect();

    let mut response = json!({
        "repo_id": repo_id,
        "pipeline_number": number,
        "step_id": step_id,
        "logs": logs,
        "total_count": total_count,
        "returned": selected.len(),
        "limited": limited,
    });
    if limited {
        response["limit_mode"] = json!({ "lines": lines, "tail": tail });
    }

    Ok(ToolResult::json(&response)?)
}
