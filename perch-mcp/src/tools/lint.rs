//! Workflow lint tool

use perch_lint::{Linter, TrustedConfiguration, WorkflowConfig};
use serde_json::{Map, Value, json};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    Arguments, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolResult,
    ensure_active,
};

pub(super) fn descriptors() -> Vec<ToolDescriptor> {
    vec![ToolDescriptor {
        name: "lint_config",
        description: "Lint a Woodpecker CI pipeline configuration file (local YAML file)",
        params: vec![
            ParamSpec::required(
                "path",
                ParamKind::String,
                "Path to the pipeline configuration file (.yaml or .yml)",
            ),
            ParamSpec::optional(
                "strict",
                ParamKind::Boolean,
                "Treat warnings as errors (default: false)",
            ),
        ],
    }]
}

pub(super) async fn lint_config(args: &Arguments, cancel: &CancellationToken) -> ToolOutcome {
    ensure_active(cancel)?;

    let path = args.get_string("path", "");
    if path.is_empty() {
        return Err(ToolError::Usage("path is required"));
    }
    if !path.ends_with(".yaml") && !path.ends_with(".yml") {
        return Err(ToolError::Usage("path must be a .yaml or .yml file"));
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(ToolError::Read)?;
    let workflow = perch_lint::parse(&raw).map_err(ToolError::Parse)?;

    let file = Path::new(&path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());
    let config = WorkflowConfig { file, workflow };

    // Linting is advisory here, so every trust-gated directive is allowed.
    let issues = Linter::new()
        .with_trusted(TrustedConfiguration::all())
        .lint(&[config]);

    let strict = args.get_bool("strict", false);
    let warning_count = issues.iter().filter(|issue| issue.is_warning).count();
    let error_count = issues.len() - warning_count;
    let valid = error_count == 0 && !(strict && warning_count > 0);
    debug!(path = %path, error_count, warning_count, "Linted config");

    let issues: Vec<Value> = issues
        .iter()
        .map(|issue| {
            let mut entry = Map::new();
            entry.insert("message".into(), json!(issue.message));
            entry.insert("is_warning".into(), json!(issue.is_warning));
            entry.insert("type".into(), json!(issue.kind.as_str()));
            if let Some(data) = &issue.data {
                entry.insert("file".into(), json!(data.file));
                entry.insert("field".into(), json!(data.field));
                if let Some(docs) = &data.docs {
                    entry.insert("docs".into(), json!(docs));
                }
            }
            Value::Object(entry)
        })
        .collect();

    let message = if strict && warning_count > 0 && error_count == 0 {
        "Config has warnings that are treated as errors in strict mode".to_string()
    } else if !valid {
        format!(
            "Config has {} error(s) and {} warning(s)",
            error_count, warning_count
        )
    } else if warning_count > 0 {
        format!("Config is valid with {} warning(s)", warning_count)
    } else {
        "Config is valid".to_string()
    };

    let mut response = json!({
        "valid": valid,
        "path": path,
        "error_count": error_count,
        "warning_count": warning_count,
        "issues": issues,
        "strict": strict,
        "message": message,
    });
    if strict && warning_count > 0 && error_count == 0 {
        response["strict_failure"] = json!(true);
    }

    Ok(ToolResult::json(&response)?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::backend::mock::MockBackend;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const CLEAN: &str = "when:\n  - event: push\nsteps:\n  build:\n    image: rust\n";
    const ONE_WARNING: &str = "steps:\n  build:\n    image: rust\n";

    fn workflow_file(contents: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn lint(file: &NamedTempFile, strict: bool) -> serde_json::Value {
        let path = file.path().to_string_lossy().into_owned();
        let result = call(
            &dispatcher(Arc::new(MockBackend::new())),
            "lint_config",
            json!({ "path": path, "strict": strict }),
        )
        .await;
        body(&result)
    }

    #[tokio::test]
    async fn test_clean_config_is_valid() {
        let file = workflow_file(CLEAN, ".yaml");
        let body = lint(&file, false).await;

        assert_eq!(body["valid"], true);
        assert_eq!(body["error_count"], 0);
        assert_eq!(body["warning_count"], 0);
        assert_eq!(body["message"], "Config is valid");
    }

    #[tokio::test]
    async fn test_warning_respects_strict() {
        let file = workflow_file(ONE_WARNING, ".yml");

        let lenient = lint(&file, false).await;
        assert_eq!(lenient["valid"], true);
        assert_eq!(lenient["warning_count"], 1);
        assert_eq!(lenient["message"], "Config is valid with 1 warning(s)");
        assert_eq!(lenient["issues"][0]["type"], "bad_habit");
        assert!(lenient.get("strict_failure").is_none());

        let strict = lint(&file, true).await;
        assert_eq!(strict["valid"], false);
        assert_eq!(strict["strict_failure"], true);
        assert_eq!(
            strict["message"],
            "Config has warnings that are treated as errors in strict mode"
        );
    }

    #[tokio::test]
    async fn test_errors_make_config_invalid() {
        let file = workflow_file("when: {event: push}\nsteps:\n  build:\n    commands: [make]\n", ".yaml");
        let body = lint(&file, false).await;

        assert_eq!(body["valid"], false);
        assert_eq!(body["error_count"], 1);
        assert_eq!(body["issues"][0]["field"], "steps.build.image");
        assert_eq!(body["message"], "Config has 1 error(s) and 0 warning(s)");
    }

    #[tokio::test]
    async fn test_path_validation() {
        let dispatcher = dispatcher(Arc::new(MockBackend::new()));

        let missing = call(&dispatcher, "lint_config", json!({})).await;
        assert_eq!(missing.text_content(), "path is required");

        let wrong = call(&dispatcher, "lint_config", json!({ "path": "ci.json" })).await;
        assert_eq!(wrong.text_content(), "path must be a .yaml or .yml file");

        let absent = call(&dispatcher, "lint_config", json!({ "path": "/nonexistent/ci.yaml" })).await;
        assert!(absent.is_error);
        assert!(absent.text_content().starts_with("Failed to read file: "));
    }

    #[tokio::test]
    async fn test_parse_failure_is_error_result() {
        let file = workflow_file("steps: [unclosed", ".yaml");
        let path = file.path().to_string_lossy().into_owned();
        let result = call(
            &dispatcher(Arc::new(MockBackend::new())),
            "lint_config",
            json!({ "path": path }),
        )
        .await;

        assert!(result.is_error);
        assert!(result.text_content().starts_with("Failed to parse YAML: "));
    }
}
