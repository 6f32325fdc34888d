//! New-file creation
//!
//! Companion to the patch engine for the case the search/replace format
//! cannot express: adding a file that does not exist yet. Refuses to
//! overwrite; an existing file is edited through a patch, not clobbered.

use std::fmt;
use std::fs;
use std::path::Path;

use mend_core::{MendError, Result};
use mend_sandbox::resolve_in_root;
use tracing::{debug, info};

/// Result of attempting to create a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Rejected(CreateRejection),
}

/// Why a create was refused. No side effect occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRejection {
    EscapesSandbox { path: String },
    AlreadyExists { path: String },
}

impl fmt::Display for CreateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateRejection::EscapesSandbox { path } => {
                write!(f, "[path {} must be inside the repository]", path)
            }
            CreateRejection::AlreadyExists { path } => {
                write!(f, "[file {} already exists]", path)
            }
        }
    }
}

/// Create a new file at `path` (relative to `root`) with `content`,
/// creating parent directories as needed.
pub fn create_file(root: &Path, path: &str, content: &str) -> Result<CreateOutcome> {
    let target = match resolve_in_root(root, path) {
        Ok(target) => target,
        Err(MendError::Sandbox(_)) => {
            debug!("Create rejected: {} escapes the sandbox", path);
            return Ok(CreateOutcome::Rejected(CreateRejection::EscapesSandbox {
                path: path.to_string(),
            }));
        }
        Err(e) => return Err(e),
    };

    if target.exists() {
        debug!("Create rejected: {} already exists", path);
        return Ok(CreateOutcome::Rejected(CreateRejection::AlreadyExists {
            path: path.to_string(),
        }));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, content)?;
    info!("Created {}", path);

    Ok(CreateOutcome::Created)
}
