//! Tool registry and dispatcher
//!
//! The catalog is built once and never changes. Each handler module declares
//! the descriptors of its tools next to the code that reads their arguments.

pub mod args;
mod lint;
mod logs;
mod pipelines;
mod repos;
pub mod result;

pub use args::{Arguments, ParamError};
pub use result::ToolResult;

use perch_client::ClientError;
use serde_json::{Map, Value, json};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::CiBackend;
use crate::resolver::{RepoResolver, ResolveError};

// =============================================================================
// Registry
// =============================================================================

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Boolean,
    Number,
    String,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "boolean",
            ParamKind::Number => "number",
            ParamKind::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }

    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }
}

/// Name, description and ordered parameters of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// JSON-Schema object describing the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.to_string(),
                json!({
                    "type": param.kind.as_str(),
                    "description": param.description,
                }),
            );
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name)
            .collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Entry for a `tools/list` response
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

/// Parameters every repository-scoped tool accepts
fn repo_params() -> [ParamSpec; 2] {
    [
        ParamSpec::optional(
            "repo_id",
            ParamKind::Number,
            "Repository ID (optional, can use repo_name or infer from git remote)",
        ),
        ParamSpec::optional(
            "repo_name",
            ParamKind::String,
            "Repository full name (optional, owner/repo, can use repo_id or infer from git remote)",
        ),
    ]
}

static CATALOG: LazyLock<Vec<ToolDescriptor>> = LazyLock::new(|| {
    let mut tools = Vec::new();
    tools.extend(repos::descriptors());
    tools.extend(pipelines::descriptors());
    tools.extend(logs::descriptors());
    tools.extend(lint::descriptors());
    tools
});

/// The tool catalog, in listing order
pub fn catalog() -> &'static [ToolDescriptor] {
    &CATALOG
}

// =============================================================================
// Errors
// =============================================================================

/// Failure of a tool call, reported to the caller as an error result
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request cancelled")]
    Cancelled,

    #[error("Invalid arguments format")]
    InvalidArguments,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Param(#[from] ParamError),

    /// A parameter combination the handler cannot act on
    #[error("{0}")]
    Usage(&'static str),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{context}: {source}")]
    Backend {
        context: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Failed to read file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(#[source] perch_lint::ParseError),

    #[error("Failed to format response: {0}")]
    Format(#[from] serde_json::Error),
}

impl ToolError {
    /// Wrap a backend failure with the operation that was attempted
    pub fn backend(context: &'static str) -> impl FnOnce(ClientError) -> ToolError {
        move |source| ToolError::Backend { context, source }
    }
}

type ToolOutcome = Result<ToolResult, ToolError>;

fn ensure_active(cancel: &CancellationToken) -> Result<(), ToolError> {
    if cancel.is_cancelled() {
        return Err(ToolError::Cancelled);
    }
    Ok(())
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes tool invocations to their handlers
///
/// Shared by every in-flight call; holds no per-call state.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn CiBackend>,
    resolver: RepoResolver,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn CiBackend>, resolver: RepoResolver) -> Self {
        Self { backend, resolver }
    }

    /// Invoke a tool by name
    ///
    /// Every failure is turned into an error result; this never panics on
    /// caller input.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: &CancellationToken,
    ) -> ToolResult {
        debug!(tool = name, "Calling tool");

        match self.route(name, arguments, cancel).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    async fn route(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: &CancellationToken,
    ) -> ToolOutcome {
        let args = match arguments {
            None | Some(Value::Null) => Arguments::default(),
            Some(Value::Object(map)) => Arguments::new(map),
            Some(_) => return Err(ToolError::InvalidArguments),
        };

        match name {
            "list_repositories" => repos::list_repositories(self, &args, cancel).await,
            "get_repository" => repos::get_repository(self, &args, cancel).await,
            "list_pipelines" => pipelines::list_pipelines(self, &args, cancel).await,
            "get_pipeline_status" => pipelines::get_pipeline_status(self, &args, cancel).await,
            "start_pipeline" => pipelines::start_pipeline(self, &args, cancel).await,
            "stop_pipeline" => pipelines::stop_pipeline(self, &args, cancel).await,
            "approve_pipeline" => pipelines::approve_pipeline(self, &args, cancel).await,
            "decline_pipeline" => pipelines::decline_pipeline(self, &args, cancel).await,
            "trigger_pipeline" => pipelines::trigger_pipeline(self, &args, cancel).await,
            "get_logs" => logs::get_logs(self, &args, cancel).await,
            "lint_config" => lint::lint_config(&args, cancel).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Resolve the repository the arguments refer to
    async fn repo_id(&self, args: &Arguments, cancel: &CancellationToken) -> Result<i64, ToolError> {
        Ok(self
            .resolver
            .resolve(self.backend.as_ref(), args, cancel)
            .await?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::backend::mock::MockBackend;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = catalog().iter().map(|tool| tool.name).collect();
        assert_eq!(names.len(), catalog().len());
        assert_eq!(catalog().len(), 11);
    }

    #[test]
    fn test_input_schema() {
        let tool = catalog()
            .iter()
            .find(|tool| tool.name == "get_logs")
            .unwrap();
        let schema = tool.input_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["tail"]["type"], "boolean");
        assert_eq!(schema["required"], json!(["pipeline_number", "step_id"]));

        let list = catalog()
            .iter()
            .find(|tool| tool.name == "list_repositories")
            .unwrap();
        assert!(list.input_schema().get("required").is_none());
    }

    #[tokio::test]
    async fn test_every_catalog_tool_is_routed() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = dispatcher(backend);

        for tool in catalog() {
            let result = call(&dispatcher, tool.name, json!({})).await;
            assert!(
                !result.text_content().starts_with("Unknown tool"),
                "{} is not routed",
                tool.name
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_names_the_tool() {
        let backend = Arc::new(MockBackend::new());
        let result = call(&dispatcher(backend.clone()), "delete_everything", json!({})).await;

        assert!(result.is_error);
        assert_eq!(result.text_content(), "Unknown tool: delete_everything");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_mapping_arguments_rejected() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = dispatcher(backend.clone());

        for arguments in [json!([1, 2]), json!("repo"), json!(3)] {
            let result = call(&dispatcher, "list_repositories", arguments).await;
            assert!(result.is_error);
            assert_eq!(result.text_content(), "Invalid arguments format");
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_absent_arguments_are_empty() {
        let backend = Arc::new(MockBackend::new());
        let result = dispatcher(backend.clone())
            .call("list_repositories", None, &CancellationToken::new())
            .await;

        assert!(!result.is_error);
        assert_eq!(backend.calls(), vec!["list_repositories()"]);
    }

    #[tokio::test]
    async fn test_cancelled_call_makes_no_backend_request() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = dispatcher(backend.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        for tool in catalog() {
            let result = dispatcher
                .call(tool.name, Some(json!({ "repo_id": 1, "pipeline_number": 1, "step_id": 1 })), &cancel)
                .await;
            assert!(result.is_error);
            assert_eq!(result.text_content(), "request cancelled");
        }
        assert!(backend.calls().is_empty());
    }
}
