//! Unified-diff fragment splitting
//!
//! A unified diff is treated as an ordered sequence of per-file fragments,
//! each starting at a `diff --git a/... b/...` header line. The file path is
//! taken from the `a/` side of the header.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

const FILE_HEADER: &str = "diff --git ";

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy, so a path containing " b/" still resolves to the real split
    // point (the last one on the line).
    RE.get_or_init(|| Regex::new(r"^diff --git a/(.*) b/").expect("static regex"))
}

/// Split a unified diff into per-file fragments.
///
/// Each fragment starts at a `diff --git` header and runs to just before the
/// next header (or end of text). Fragments are trimmed; content before the
/// first header is ignored. Empty or whitespace-only input yields no
/// fragments.
pub fn split_by_files(diff: &str) -> Vec<&str> {
    let mut header_offsets = Vec::new();
    let mut offset = 0;
    for line in diff.split_inclusive('\n') {
        if line.starts_with(FILE_HEADER) {
            header_offsets.push(offset);
        }
        offset += line.len();
    }

    let mut fragments = Vec::with_capacity(header_offsets.len());
    for (i, &start) in header_offsets.iter().enumerate() {
        let end = header_offsets.get(i + 1).copied().unwrap_or(diff.len());
        let fragment = diff[start..end].trim();
        if !fragment.is_empty() {
            fragments.push(fragment);
        }
    }
    fragments
}

/// Extract the `a/<path>` side of a fragment's header line.
pub fn fragment_path(fragment: &str) -> Option<&str> {
    let first_line = fragment.lines().next()?;
    header_re()
        .captures(first_line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Map each file path in a diff to its fragment.
///
/// Fragments whose header does not parse are keyed under the empty string,
/// mirroring how a malformed header is treated on both sides of a
/// comparison.
pub fn fragments_by_path(diff: &str) -> HashMap<&str, &str> {
    split_by_files(diff)
        .into_iter()
        .map(|fragment| (fragment_path(fragment).unwrap_or(""), fragment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILE_DIFF: &str = "\
diff --git a/src/a.py b/src/a.py
index 83db48f..bf269f4 100644
--- a/src/a.py
+++ b/src/a.py
@@ -1,2 +1,2 @@
-old
+new
diff --git a/src/b.py b/src/b.py
--- a/src/b.py
+++ b/src/b.py
@@ -1 +1 @@
-x
+y
";

    #[test]
    fn test_split_two_files() {
        let fragments = split_by_files(TWO_FILE_DIFF);
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].starts_with("diff --git a/src/a.py"));
        assert!(fragments[0].ends_with("+new"));
        assert!(fragments[1].starts_with("diff --git a/src/b.py"));
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_by_files("").is_empty());
        assert!(split_by_files("   \n\n  ").is_empty());
    }

    #[test]
    fn test_split_ignores_preamble() {
        let diff = format!("some log output\nnot a diff\n{}", TWO_FILE_DIFF);
        assert_eq!(split_by_files(&diff).len(), 2);
    }

    #[test]
    fn test_fragment_path() {
        let fragments = split_by_files(TWO_FILE_DIFF);
        assert_eq!(fragment_path(fragments[0]), Some("src/a.py"));
        assert_eq!(fragment_path(fragments[1]), Some("src/b.py"));
    }

    #[test]
    fn test_fragment_path_malformed_header() {
        assert_eq!(fragment_path("diff --git nonsense\n--- a/x\n"), None);
        assert_eq!(fragment_path(""), None);
    }

    #[test]
    fn test_fragments_by_path() {
        let map = fragments_by_path(TWO_FILE_DIFF);
        assert_eq!(map.len(), 2);
        assert!(map["src/a.py"].contains("+new"));
        assert!(map["src/b.py"].contains("+y"));
    }
}
