//! Ephemeral workspace lifecycle
//!
//! One workspace = one cloned checkout, owned by exactly one session.
//! `acquire` shallow-fetches a single commit into a fresh directory under the
//! temp prefix; `release` harvests the working-tree diff and deletes the
//! directory. Deletion refuses to touch anything outside the temp prefix;
//! that invariant protects non-ephemeral data and is never downgraded.

use std::path::{Path, PathBuf};

use mend_core::{MendError, Result};
use tracing::{info, instrument, warn};

use crate::git::{working_tree_diff, GitCommand, GitExecutor, GitOutput};

/// Creates and destroys ephemeral repository workspaces.
pub struct WorkspaceLifecycle<E: GitExecutor> {
    executor: E,
    temp_prefix: PathBuf,
}

impl WorkspaceLifecycle<GitCommand> {
    /// Lifecycle manager backed by the real git binary, rooted at the
    /// system temp directory.
    pub fn new() -> Result<Self> {
        Self::with_executor(GitCommand::new())
    }
}

impl<E: GitExecutor> WorkspaceLifecycle<E> {
    /// Lifecycle manager with a custom executor (mockable in tests).
    pub fn with_executor(executor: E) -> Result<Self> {
        let temp_prefix = std::env::temp_dir()
            .canonicalize()
            .map_err(|e| MendError::Workspace(format!("cannot resolve temp dir: {}", e)))?;
        Ok(Self {
            executor,
            temp_prefix,
        })
    }

    /// The prefix under which all ephemeral workspaces live.
    pub fn temp_prefix(&self) -> &Path {
        &self.temp_prefix
    }

    /// Clone `repo_handle` (`owner/name`) at `commit_id` into a fresh
    /// ephemeral directory and return its path.
    ///
    /// Only the single commit is fetched (depth 1). A failed clone removes
    /// the partially-initialized directory before returning the error.
    #[instrument(skip(self))]
    pub async fn acquire(&self, repo_handle: &str, commit_id: &str) -> Result<PathBuf> {
        let workspace = tempfile::Builder::new()
            .prefix("mend-")
            .tempdir_in(&self.temp_prefix)?
            .into_path();

        info!(
            "Cloning {} at {} into {}",
            repo_handle,
            commit_id,
            workspace.display()
        );

        if let Err(e) = self.clone_at_commit(&workspace, repo_handle, commit_id).await {
            warn!("Clone failed, removing {}", workspace.display());
            let _ = std::fs::remove_dir_all(&workspace);
            return Err(e);
        }

        Ok(workspace)
    }

    /// Harvest the working-tree diff and delete the workspace.
    ///
    /// Returns the generated diff. Refuses with
    /// [`MendError::UnsafeCleanup`] unless the path is strictly under the
    /// temp prefix, leaving the directory intact.
    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    pub async fn release(&self, workspace: &Path) -> Result<String> {
        let canonical = workspace
            .canonicalize()
            .map_err(|e| MendError::Workspace(format!("cannot resolve workspace: {}", e)))?;

        // Strict descendant only: the temp prefix itself is never a workspace.
        if canonical == self.temp_prefix || !canonical.starts_with(&self.temp_prefix) {
            return Err(MendError::UnsafeCleanup(canonical.display().to_string()));
        }

        let diff = working_tree_diff(&self.executor, &canonical).await?;

        std::fs::remove_dir_all(&canonical)?;
        info!("Released workspace {}", canonical.display());

        Ok(diff)
    }

    async fn clone_at_commit(
        &self,
        workspace: &Path,
        repo_handle: &str,
        commit_id: &str,
    ) -> Result<()> {
        let remote_url = format!("https://github.com/{}.git", repo_handle);

        self.run_checked(&["init"], workspace).await?;
        self.run_checked(&["remote", "add", "origin", &remote_url], workspace)
            .await?;
        self.run_checked(&["fetch", "--depth", "1", "origin", commit_id], workspace)
            .await?;
        self.run_checked(&["checkout", commit_id], workspace).await?;

        Ok(())
    }

    async fn run_checked(&self, args: &[&str], cwd: &Path) -> Result<GitOutput> {
        let output = self.executor.exec(args, cwd).await?;
        if !output.success {
            return Err(MendError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr
            )));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGitExecutor;

    fn mock_clone_executor() -> MockGitExecutor {
        MockGitExecutor::new()
            .with_response("init", GitOutput::ok(""))
            .with_response(
                "remote add origin https://github.com/octocat/hello.git",
                GitOutput::ok(""),
            )
            .with_response("fetch --depth 1 origin abc123", GitOutput::ok(""))
            .with_response("checkout abc123", GitOutput::ok(""))
    }

    #[tokio::test]
    async fn test_acquire_and_release_with_mock() {
        let executor = mock_clone_executor()
            .with_response("diff", GitOutput::ok("diff --git a/a.py b/a.py\n"));
        let lifecycle = WorkspaceLifecycle::with_executor(executor).unwrap();

        let workspace = lifecycle.acquire("octocat/hello", "abc123").await.unwrap();
        assert!(workspace.exists());
        assert!(workspace.starts_with(lifecycle.temp_prefix()));

        let diff = lifecycle.release(&workspace).await.unwrap();
        assert!(diff.contains("a.py"));
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn test_failed_clone_cleans_up() {
        let executor = MockGitExecutor::new()
            .with_response("init", GitOutput::ok(""))
            .with_response(
                "remote add origin https://github.com/octocat/hello.git",
                GitOutput::ok(""),
            )
            .with_response(
                "fetch --depth 1 origin abc123",
                GitOutput::failed("fatal: could not read from remote"),
            );
        let lifecycle = WorkspaceLifecycle::with_executor(executor).unwrap();

        let err = lifecycle.acquire("octocat/hello", "abc123").await.unwrap_err();
        assert!(matches!(err, MendError::Git(_)));
    }

    #[tokio::test]
    async fn test_release_refuses_temp_prefix_itself() {
        let lifecycle = WorkspaceLifecycle::with_executor(MockGitExecutor::new()).unwrap();

        let prefix = lifecycle.temp_prefix().to_path_buf();
        let err = lifecycle.release(&prefix).await.unwrap_err();
        assert!(matches!(err, MendError::UnsafeCleanup(_)));
        assert!(prefix.exists());
    }

    #[tokio::test]
    async fn test_release_refuses_paths_outside_temp_prefix() {
        let lifecycle = WorkspaceLifecycle::with_executor(MockGitExecutor::new()).unwrap();

        // A directory that exists but is not under the temp prefix.
        let outside = std::env::current_dir().unwrap();

        let err = lifecycle.release(&outside).await.unwrap_err();
        assert!(matches!(err, MendError::UnsafeCleanup(_)));
        assert!(outside.exists(), "refused cleanup must leave the directory intact");
    }

    #[tokio::test]
    async fn test_release_with_real_git() {
        let git = GitCommand::new();
        let lifecycle = WorkspaceLifecycle::new().unwrap();

        // Build a local repo under the temp prefix, no network needed.
        let workspace = tempfile::Builder::new()
            .prefix("mend-test-")
            .tempdir_in(lifecycle.temp_prefix())
            .unwrap()
            .into_path();

        let run = |args: Vec<&'static str>, cwd: PathBuf| {
            let git = git.clone();
            async move { git.exec(&args, &cwd).await.unwrap() }
        };

        run(vec!["init"], workspace.clone()).await;
        std::fs::write(workspace.join("a.txt"), "one\n").unwrap();
        run(vec!["add", "."], workspace.clone()).await;
        run(
            vec![
                "-c",
                "user.email=mend@test",
                "-c",
                "user.name=mend",
                "commit",
                "-m",
                "init",
            ],
            workspace.clone(),
        )
        .await;

        // Uncommitted edit -> the harvested diff must mention the file.
        std::fs::write(workspace.join("a.txt"), "two\n").unwrap();

        let diff = lifecycle.release(&workspace).await.unwrap();
        assert!(diff.contains("a.txt"));
        assert!(!workspace.exists());
    }
}
