//! Repository resolver
//!
//! Turns the `repo_id` / `repo_name` arguments of a tool call, or failing
//! those the local git remote, into a canonical repository id.

use async_trait::async_trait;
use perch_client::ClientError;
use perch_core::domain::repo::Repo;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::CiBackend;
use crate::tools::args::Arguments;

/// Why a repository reference could not be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("repo_id must be a number")]
    RepoIdNotANumber,

    #[error("repo_id must be a positive number, got {0}")]
    RepoIdNotPositive(i64),

    #[error("repo_name must be a string")]
    RepoNameNotAString,

    #[error("failed to lookup repository: {0}")]
    Lookup(#[source] ClientError),

    #[error(
        "either repo_id, repo_name must be provided, or git remote must be available: failed to lookup inferred repository {name}: {source}"
    )]
    InferredLookup {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("repository {0} has no valid id")]
    InvalidId(String),

    #[error("either repo_id, repo_name must be provided, or git remote must be available")]
    Unresolvable,
}

/// Source of the local "origin" remote URL
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn origin_url(&self) -> Option<String>;
}

/// Reads the remote with `git remote get-url origin` in the working directory
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRemote;

#[async_trait]
impl RemoteSource for GitRemote {
    async fn origin_url(&self) -> Option<String> {
        let output = tokio::process::Command::new("git")
            .args(["remote", "get-url", "origin"])
            .output()
            .await
            .map_err(|e| debug!(error = %e, "Failed to run git"))
            .ok()?;

        if !output.status.success() {
            debug!(status = %output.status, "No git remote available");
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Resolves repository references to ids
#[derive(Clone)]
pub struct RepoResolver {
    remote: Arc<dyn RemoteSource>,
}

impl RepoResolver {
    pub fn new(remote: Arc<dyn RemoteSource>) -> Self {
        Self { remote }
    }

    /// Resolver backed by the git checkout in the working directory
    pub fn git() -> Self {
        Self::new(Arc::new(GitRemote))
    }

    /// Resolve the repository an invocation refers to
    ///
    /// Tries `repo_id`, then `repo_name`, then the git remote; the first one
    /// present wins. Issues at most one backend call.
    pub async fn resolve(
        &self,
        backend: &dyn CiBackend,
        args: &Arguments,
        cancel: &CancellationToken,
    ) -> Result<i64, ResolveError> {
        if let Some(value) = args.get("repo_id") {
            let repo_id = value.as_f64().ok_or(ResolveError::RepoIdNotANumber)? as i64;
            if repo_id <= 0 {
                return Err(ResolveError::RepoIdNotPositive(repo_id));
            }
            return Ok(repo_id);
        }

        if let Some(value) = args.get("repo_name") {
            let name = value.as_str().ok_or(ResolveError::RepoNameNotAString)?;
            let repo = backend
                .lookup_repository(name, cancel)
                .await
                .map_err(ResolveError::Lookup)?;
            return checked_id(name, repo);
        }

        let name = match self.remote.origin_url().await {
            Some(url) => parse_remote_url(&url).ok_or(ResolveError::Unresolvable)?,
            None => return Err(ResolveError::Unresolvable),
        };
        debug!(repo_name = %name, "Inferred repository from git remote");

        match backend.lookup_repository(&name, cancel).await {
            Ok(repo) => checked_id(&name, repo),
            Err(source) => Err(ResolveError::InferredLookup { name, source }),
        }
    }
}

fn checked_id(name: &str, repo: Repo) -> Result<i64, ResolveError> {
    if repo.id <= 0 {
        return Err(ResolveError::InvalidId(name.to_string()));
    }
    Ok(repo.id)
}

/// Extract "owner/name" from a git remote URL
///
/// Strips `https://`, `http://` and `git@` prefixes and a `.git` suffix. When a
/// `:` remains, everything up to it is dropped (SSH form). Of the remaining
/// path, everything after the first dotted segment is returned, or the last two
/// segments when no segment looks like a host.
pub fn parse_remote_url(remote: &str) -> Option<String> {
    let mut url = remote.trim();
    for prefix in ["https://", "http://", "git@"] {
        url = url.strip_prefix(prefix).unwrap_or(url);
    }
    url = url.strip_suffix(".git").unwrap_or(url);

    if let Some((_, path)) = url.split_once(':') {
        url = path;
    }

    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 2 {
        return None;
    }

    let name = match parts
        .iter()
        .enumerate()
        .find(|(i, part)| part.contains('.') && i + 1 < parts.len())
    {
        Some((i, _)) => parts[i + 1..].join("/"),
        None => parts[parts.len() - 2..].join("/"),
    };

    (!name.is_empty()).then_some(name)
}
