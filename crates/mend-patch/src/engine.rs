//! Literal search/replace patch engine
//!
//! Deliberately conservative: the search string must occur exactly once in
//! the target file, or the patch is rejected with a diagnostic the agent can
//! act on. Ambiguity is never auto-resolved by picking a match. A rejected
//! patch leaves the file byte-identical.

use std::fmt;
use std::fs;
use std::path::Path;

use mend_core::{MendError, Result};
use mend_sandbox::resolve_in_root;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maximum number of line-number hints attached to an ambiguous rejection.
const MAX_LOCATION_HINTS: usize = 3;

/// A literal edit proposed by the agent, as it arrives from a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Exact text to find (must occur exactly once)
    pub search: String,
    /// Replacement text
    pub replace: String,
    /// File path relative to the sandbox root
    pub file: String,
}

impl PatchRequest {
    /// Parse a request from tool-call JSON arguments.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Result of attempting a patch: either applied, or rejected with a reason.
///
/// Rejections are data, not errors: the driving loop relays them to the
/// agent as text and the session continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The single occurrence was replaced and the file written back.
    Applied,
    /// Nothing was written; the reason says why.
    Rejected(PatchRejection),
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied)
    }
}

/// Why a patch was refused. No side effect occurred in any of these cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchRejection {
    /// The search string was empty.
    EmptySearch,
    /// The target path resolves outside the sandbox root.
    EscapesSandbox { file: String },
    /// The target file does not exist.
    FileNotFound { file: String },
    /// Zero occurrences of the search string. If the search spans multiple
    /// lines and its first line alone does occur, `first_line` carries it so
    /// the agent can be pointed at a whitespace/indentation mismatch.
    SearchNotFound { first_line: Option<String> },
    /// More than one occurrence; `lines` holds up to three 1-based line
    /// numbers where the first search line appears.
    Ambiguous { occurrences: usize, lines: Vec<usize> },
}

impl fmt::Display for PatchRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchRejection::EmptySearch => {
                write!(f, "[invalid patch: 'search' may not be empty]")
            }
            PatchRejection::EscapesSandbox { file } => {
                write!(f, "[file {} must be inside the repository]", file)
            }
            PatchRejection::FileNotFound { file } => {
                write!(f, "[file {} not found]", file)
            }
            PatchRejection::SearchNotFound { first_line: Some(line) } => {
                write!(
                    f,
                    "[search string not found, but '{}' exists in file. Check whitespace/indentation]",
                    snippet(line)
                )
            }
            PatchRejection::SearchNotFound { first_line: None } => {
                write!(
                    f,
                    "[search string not found - try using grep to find the exact text]"
                )
            }
            PatchRejection::Ambiguous { occurrences, lines } => {
                write!(f, "[ambiguous search string: {} occurrences", occurrences)?;
                if !lines.is_empty() {
                    let hints: Vec<String> =
                        lines.iter().map(|n| format!("match at line {}", n)).collect();
                    write!(f, ". Add more context. Locations: {}", hints.join(" | "))?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Apply a literal search/replace to exactly one file under `root`.
///
/// The file is either left completely unchanged or changed by precisely one
/// substitution. I/O faults (unreadable file, failed write) surface as
/// errors; everything the agent can fix surfaces as a [`PatchRejection`].
pub fn apply_patch(root: &Path, request: &PatchRequest) -> Result<PatchOutcome> {
    if request.search.is_empty() {
        return Ok(PatchOutcome::Rejected(PatchRejection::EmptySearch));
    }

    let target = match resolve_in_root(root, &request.file) {
        Ok(path) => path,
        Err(MendError::Sandbox(_)) => {
            debug!("Patch rejected: {} escapes the sandbox", request.file);
            return Ok(PatchOutcome::Rejected(PatchRejection::EscapesSandbox {
                file: request.file.clone(),
            }));
        }
        Err(e) => return Err(e),
    };

    if !target.is_file() {
        debug!("Patch rejected: file {} not found", request.file);
        return Ok(PatchOutcome::Rejected(PatchRejection::FileNotFound {
            file: request.file.clone(),
        }));
    }

    let text = fs::read_to_string(&target)?;
    let occurrences = text.matches(&request.search).count();

    match occurrences {
        0 => {
            debug!("Patch rejected: search string not found in {}", request.file);
            Ok(PatchOutcome::Rejected(PatchRejection::SearchNotFound {
                first_line: whitespace_mismatch_hint(&text, &request.search),
            }))
        }
        1 => {
            let new_text = text.replacen(&request.search, &request.replace, 1);
            fs::write(&target, new_text)?;
            info!("Applied patch to {}", request.file);
            Ok(PatchOutcome::Applied)
        }
        n => {
            debug!("Patch rejected: {} occurrences in {}", n, request.file);
            Ok(PatchOutcome::Rejected(PatchRejection::Ambiguous {
                occurrences: n,
                lines: match_line_hints(&text, &request.search),
            }))
        }
    }
}

/// If a multi-line search failed but its first line alone occurs in the
/// file, the indentation of the later lines is the likely culprit.
fn whitespace_mismatch_hint(text: &str, search: &str) -> Option<String> {
    let mut lines = search.trim().lines();
    let first = lines.next()?.trim();
    if lines.next().is_none() || first.is_empty() {
        return None;
    }
    text.contains(first).then(|| first.to_string())
}

/// 1-based line numbers where the first line of the search string occurs,
/// capped at [`MAX_LOCATION_HINTS`].
fn match_line_hints(text: &str, search: &str) -> Vec<usize> {
    let first = match search.trim().lines().next().map(str::trim) {
        Some(line) if !line.is_empty() => line,
        _ => return Vec::new(),
    };

    text.lines()
        .enumerate()
        .filter(|(_, line)| line.contains(first))
        .map(|(i, _)| i + 1)
        .take(MAX_LOCATION_HINTS)
        .collect()
}

fn snippet(line: &str) -> &str {
    let mut end = line.len().min(30);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(search: &str, replace: &str, file: &str) -> PatchRequest {
        PatchRequest {
            search: search.to_string(),
            replace: replace.to_string(),
            file: file.to_string(),
        }
    }

    #[test]
    fn test_single_occurrence_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.py");
        fs::write(&file, "def main():\n    return 1\n").unwrap();

        let outcome =
            apply_patch(dir.path(), &request("return 1", "return 2", "main.py")).unwrap();

        assert_eq!(outcome, PatchOutcome::Applied);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "def main():\n    return 2\n"
        );
    }

    #[test]
    fn test_ambiguous_two_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "foo\nfoo\n").unwrap();

        let outcome = apply_patch(dir.path(), &request("foo", "bar", "a.txt")).unwrap();

        match outcome {
            PatchOutcome::Rejected(PatchRejection::Ambiguous { occurrences, lines }) => {
                assert_eq!(occurrences, 2);
                assert_eq!(lines, vec![1, 2]);
            }
            other => panic!("expected ambiguous rejection, got {:?}", other),
        }
        // Idempotence of failure: the file is untouched.
        assert_eq!(fs::read_to_string(&file).unwrap(), "foo\nfoo\n");
    }

    #[test]
    fn test_search_not_found_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "alpha beta\n").unwrap();

        let outcome = apply_patch(dir.path(), &request("gamma", "delta", "a.txt")).unwrap();

        assert_eq!(
            outcome,
            PatchOutcome::Rejected(PatchRejection::SearchNotFound { first_line: None })
        );
        assert_eq!(fs::read_to_string(&file).unwrap(), "alpha beta\n");
    }

    #[test]
    fn test_multiline_miss_hints_at_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.py"),
            "def f():\n    return 1\n",
        )
        .unwrap();

        // First line matches, second line has the wrong indentation.
        let outcome =
            apply_patch(dir.path(), &request("def f():\n  return 1", "x", "a.py")).unwrap();

        match outcome {
            PatchOutcome::Rejected(PatchRejection::SearchNotFound { first_line }) => {
                assert_eq!(first_line.as_deref(), Some("def f():"));
            }
            other => panic!("expected whitespace hint, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = apply_patch(dir.path(), &request("a", "b", "nope.txt")).unwrap();
        assert_eq!(
            outcome,
            PatchOutcome::Rejected(PatchRejection::FileNotFound {
                file: "nope.txt".to_string()
            })
        );
    }

    #[test]
    fn test_escaping_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outcome =
            apply_patch(dir.path(), &request("a", "b", "../outside.txt")).unwrap();
        assert!(matches!(
            outcome,
            PatchOutcome::Rejected(PatchRejection::EscapesSandbox { .. })
        ));
    }

    #[test]
    fn test_empty_search_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "content").unwrap();

        let outcome = apply_patch(dir.path(), &request("", "b", "a.txt")).unwrap();
        assert_eq!(outcome, PatchOutcome::Rejected(PatchRejection::EmptySearch));
    }

    #[test]
    fn test_rejection_messages_are_bracketed() {
        let msg = PatchRejection::Ambiguous {
            occurrences: 2,
            lines: vec![3, 9],
        }
        .to_string();
        assert!(msg.starts_with('['));
        assert!(msg.contains("2 occurrences"));
        assert!(msg.contains("match at line 3 | match at line 9"));

        let msg = PatchRejection::FileNotFound {
            file: "src/a.py".to_string(),
        }
        .to_string();
        assert_eq!(msg, "[file src/a.py not found]");
    }

    #[test]
    fn test_request_from_json() {
        let req = PatchRequest::from_json(
            r#"{"search": "old", "replace": "new", "file": "src/lib.rs"}"#,
        )
        .unwrap();
        assert_eq!(req.search, "old");
        assert_eq!(req.file, "src/lib.rs");
    }
}
