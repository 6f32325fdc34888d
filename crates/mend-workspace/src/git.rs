//! Git command execution abstraction

use async_trait::async_trait;
use mend_core::{MendError, Result};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Output from a git command
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl GitOutput {
    /// A successful output with the given stdout (test/mock convenience).
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    /// A failed output with the given stderr (test/mock convenience).
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Trait for executing git commands (allows mocking in tests)
#[async_trait]
pub trait GitExecutor: Send + Sync {
    /// Execute a git command with the given arguments in `cwd`
    async fn exec(&self, args: &[&str], cwd: &Path) -> Result<GitOutput>;
}

/// Real git command executor
#[derive(Debug, Clone, Default)]
pub struct GitCommand;

impl GitCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitExecutor for GitCommand {
    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    async fn exec(&self, args: &[&str], cwd: &Path) -> Result<GitOutput> {
        debug!("Executing git {:?}", args);

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| MendError::Git(format!("Failed to execute git: {}", e)))?;

        let git_output = GitOutput::from(output);

        if !git_output.success {
            debug!("Git command failed: {}", git_output.stderr);
        }

        Ok(git_output)
    }
}

/// Mock git executor for testing
#[derive(Clone, Default)]
pub struct MockGitExecutor {
    responses: std::collections::HashMap<String, GitOutput>,
}

impl MockGitExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, command: &str, output: GitOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }
}

#[async_trait]
impl GitExecutor for MockGitExecutor {
    async fn exec(&self, args: &[&str], _cwd: &Path) -> Result<GitOutput> {
        let key = args.join(" ");
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| MendError::Git(format!("No mock response for: {}", key)))
    }
}

/// Whether `path` looks like the root of a git checkout.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Whether the working tree has no uncommitted changes.
pub async fn is_clean<E: GitExecutor>(executor: &E, repo_root: &Path) -> Result<bool> {
    let output = executor.exec(&["status", "--porcelain"], repo_root).await?;
    if !output.success {
        return Err(MendError::Git(output.stderr));
    }
    Ok(output.stdout.trim().is_empty())
}

/// Unified diff of the working tree against the checked-out commit.
pub async fn working_tree_diff<E: GitExecutor>(executor: &E, repo_root: &Path) -> Result<String> {
    let output = executor.exec(&["diff"], repo_root).await?;
    if !output.success {
        return Err(MendError::Git(output.stderr));
    }
    Ok(output.stdout)
}

/// Unified diff of a single file, by path relative to the repo root.
pub async fn diff_file<E: GitExecutor>(
    executor: &E,
    repo_root: &Path,
    rel_file: &str,
) -> Result<String> {
    let output = executor.exec(&["diff", "--", rel_file], repo_root).await?;
    if !output.success {
        return Err(MendError::Git(output.stderr));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_executor() {
        let executor = MockGitExecutor::new()
            .with_response("status --porcelain", GitOutput::ok(" M src/lib.rs\n"));

        let output = executor
            .exec(&["status", "--porcelain"], Path::new("/mock/repo"))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, " M src/lib.rs\n");
    }

    #[tokio::test]
    async fn test_mock_executor_unknown_command() {
        let executor = MockGitExecutor::new();
        let err = executor
            .exec(&["log"], Path::new("/mock/repo"))
            .await
            .unwrap_err();
        assert!(matches!(err, MendError::Git(_)));
    }

    #[tokio::test]
    async fn test_is_clean_via_mock() {
        let clean = MockGitExecutor::new().with_response("status --porcelain", GitOutput::ok(""));
        assert!(is_clean(&clean, Path::new("/mock/repo")).await.unwrap());

        let dirty = MockGitExecutor::new()
            .with_response("status --porcelain", GitOutput::ok(" M a.py\n"));
        assert!(!is_clean(&dirty, Path::new("/mock/repo")).await.unwrap());
    }

    #[test]
    fn test_is_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(is_git_repo(dir.path()));
    }
}
