//! Sandbox path guard
//!
//! Every externally supplied path is resolved through [`resolve_in_root`]
//! before any read or write. The check runs on the *resolved* path: `..`
//! segments and symlinks are followed first, so a naive string-prefix test on
//! the unresolved input can never be fooled into accepting an escape.

use std::path::{Component, Path, PathBuf};

use mend_core::{MendError, Result};
use tracing::debug;

/// Resolve `relative` against `root` and verify the result stays inside the
/// sandbox.
///
/// The root itself is a permitted target. The target does not have to exist:
/// the existing prefix is canonicalized (following symlinks) and the
/// remaining segments are normalized lexically, so traversal through
/// not-yet-created directories is still caught.
pub fn resolve_in_root(root: &Path, relative: impl AsRef<Path>) -> Result<PathBuf> {
    let relative = relative.as_ref();

    let canonical_root = root
        .canonicalize()
        .map_err(|e| MendError::Sandbox(format!("cannot resolve sandbox root: {}", e)))?;

    let joined = canonical_root.join(relative);
    let resolved = resolve_lenient(&joined)?;

    if resolved.starts_with(&canonical_root) {
        Ok(resolved)
    } else {
        debug!(
            "Rejected path {} (resolves to {})",
            relative.display(),
            resolved.display()
        );
        Err(MendError::Sandbox(format!(
            "path '{}' escapes the sandbox",
            relative.display()
        )))
    }
}

/// Whether an absolute `candidate` path lies inside `root` (or is the root).
///
/// Both sides are canonicalized; a candidate that cannot be resolved is
/// treated as outside.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    match (root.canonicalize(), candidate.canonicalize()) {
        (Ok(root), Ok(candidate)) => candidate.starts_with(&root),
        _ => false,
    }
}

/// Canonicalize a path that may not fully exist: resolve the deepest existing
/// ancestor, then normalize the nonexistent tail lexically.
fn resolve_lenient(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut existing = path.to_path_buf();
            let mut tail: Vec<std::ffi::OsString> = Vec::new();

            while !existing.exists() {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    // A ".."/"." tail component has no file_name; strip it
                    // lexically and keep walking up.
                    _ => {
                        let mut comps = existing.components();
                        match comps.next_back() {
                            Some(last) => {
                                tail.push(last.as_os_str().to_os_string());
                                existing = comps.as_path().to_path_buf();
                            }
                            None => break,
                        }
                    }
                }
            }

            let base = existing
                .canonicalize()
                .map_err(|e| MendError::Sandbox(format!("cannot resolve path: {}", e)))?;

            let mut rebuilt = base;
            for segment in tail.into_iter().rev() {
                rebuilt.push(segment);
            }
            Ok(normalize_lexically(&rebuilt))
        }
        Err(e) => Err(MendError::Sandbox(format!("cannot resolve path: {}", e))),
    }
}

/// Remove `.` segments and cancel `..` segments without touching the
/// filesystem. Popping past the root is clamped at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir)
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
