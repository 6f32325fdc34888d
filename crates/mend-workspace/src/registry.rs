//! Session workspace registry
//!
//! Shared bookkeeping across sessions: which instance owns which cloned
//! workspace, and, after cleanup, the diff that was harvested from it.
//! Individual workspaces are single-owner, but sessions may run on separate
//! threads, so the map itself is mutex-guarded. The registry is an explicit
//! owned value passed by reference to workers, not a process-wide singleton.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use mend_core::{MendError, Result};
use tracing::debug;

use crate::git::GitExecutor;
use crate::lifecycle::WorkspaceLifecycle;

/// Generator for fresh session/instance identifiers.
pub struct SessionId;

impl SessionId {
    pub fn generate() -> String {
        format!("session-{}", &uuid::Uuid::new_v4().to_string()[..8])
    }
}

/// State of one session as tracked by the registry.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// The session owns a live cloned workspace.
    Active {
        workspace: PathBuf,
        acquired_at: DateTime<Utc>,
    },
    /// The workspace was released; only the harvested diff remains.
    Released { diff: String },
}

/// Thread-safe map from instance id to session state.
#[derive(Debug, Default)]
pub struct WorkspaceRegistry {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `instance_id` now owns `workspace`.
    pub fn register(&self, instance_id: &str, workspace: PathBuf) {
        debug!("Registering workspace for {}", instance_id);
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            instance_id.to_string(),
            SessionState::Active {
                workspace,
                acquired_at: Utc::now(),
            },
        );
    }

    /// Path of the live workspace for `instance_id`, if any.
    pub fn path_of(&self, instance_id: &str) -> Option<PathBuf> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(instance_id) {
            Some(SessionState::Active { workspace, .. }) => Some(workspace.clone()),
            _ => None,
        }
    }

    /// Harvested diff for `instance_id`, if its workspace was released.
    pub fn diff_of(&self, instance_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(instance_id) {
            Some(SessionState::Released { diff }) => Some(diff.clone()),
            _ => None,
        }
    }

    /// Release the workspace owned by `instance_id` through `lifecycle`,
    /// store the harvested diff, and return it.
    pub async fn harvest<E: GitExecutor>(
        &self,
        instance_id: &str,
        lifecycle: &WorkspaceLifecycle<E>,
    ) -> Result<String> {
        let workspace = self.path_of(instance_id).ok_or_else(|| {
            MendError::Workspace(format!("no active workspace for {}", instance_id))
        })?;

        // The lock is not held across the await.
        let diff = lifecycle.release(&workspace).await?;

        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            instance_id.to_string(),
            SessionState::Released { diff: diff.clone() },
        );

        Ok(diff)
    }

    /// Remove and return whatever state `instance_id` had.
    pub fn remove(&self, instance_id: &str) -> Option<SessionState> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(instance_id)
    }

    /// Release every still-active workspace through `lifecycle` and drop all
    /// tracked state, active and released alike. End-of-run cleanup; a
    /// refused or failed release aborts and leaves the remaining entries in
    /// place.
    pub async fn clear_all<E: GitExecutor>(
        &self,
        lifecycle: &WorkspaceLifecycle<E>,
    ) -> Result<()> {
        let active: Vec<String> = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .iter()
                .filter(|(_, state)| matches!(state, SessionState::Active { .. }))
                .map(|(id, _)| id.clone())
                .collect()
        };

        for instance_id in active {
            debug!("Clearing workspace for {}", instance_id);
            self.harvest(&instance_id, lifecycle).await?;
        }

        self.sessions.lock().unwrap().clear();
        Ok(())
    }

    /// Number of tracked sessions (active or released).
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
