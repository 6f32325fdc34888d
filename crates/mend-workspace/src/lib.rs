//! # mend-workspace
//!
//! Ephemeral repository workspaces for Mend sessions.
//!
//! A workspace is a shallow clone of one repository at one commit, created
//! under the system temp directory for the duration of a single repair
//! session and destroyed when the session ends. Destruction harvests the
//! working-tree diff first, so the session's output survives the cleanup.
//! The [`WorkspaceRegistry`] tracks which instance owns which workspace.

mod git;
mod lifecycle;
mod registry;

pub use git::{diff_file, is_clean, is_git_repo, working_tree_diff};
pub use git::{GitCommand, GitExecutor, GitOutput, MockGitExecutor};
pub use lifecycle::WorkspaceLifecycle;
pub use registry::{SessionId, SessionState, WorkspaceRegistry};
