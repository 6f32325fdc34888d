//! Restricted shell command execution
//!
//! Commands run under `bash -r` (restricted mode): no redirection, no `cd`,
//! no commands named by path. The repository can be read freely but not
//! written through this tool, which is what makes it safe to hand to an
//! exploring agent. Working-directory state persists across calls within a
//! session; a move that would leave the sandbox root is discarded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use mend_core::{MendError, Result, SessionOptions};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::guard;

/// Sentinel markers used to smuggle the shell's final state out of the same
/// invocation as the command itself.
const RC_SENTINEL: &str = "__MEND_RC__";
const CWD_SENTINEL: &str = "__MEND_CWD__";

/// Result of one shell invocation: agent-facing text plus the working
/// directory to use for the next call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellOutcome {
    /// Captured output (stdout + stderr, possibly truncated), with any
    /// failure/timeout/budget annotations folded in.
    pub output: String,
    /// Working directory for the next invocation.
    pub cwd: PathBuf,
}

/// Executes single shell commands inside a sandbox root.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    root: PathBuf,
    timeout: Duration,
    truncation_limit: usize,
    budget_warning_at: u32,
}

impl ShellRunner {
    /// Create a runner rooted at `root`, configured from session options.
    pub fn new(root: impl AsRef<Path>, options: &SessionOptions) -> Result<Self> {
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|e| MendError::Sandbox(format!("cannot resolve sandbox root: {}", e)))?;
        Ok(Self {
            root,
            timeout: Duration::from_secs(options.timeout_secs),
            truncation_limit: options.truncation_limit,
            budget_warning_at: 5,
        })
    }

    /// Override the remaining-call count at which budget warnings start.
    pub fn with_budget_warning_at(mut self, remaining: u32) -> Self {
        self.budget_warning_at = remaining;
        self
    }

    /// Sandbox root this runner is confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one command from `cwd`, returning the captured output and the
    /// working directory for the next call.
    ///
    /// Non-zero exit, timeout, and blocked directory moves are all reported
    /// in the output text rather than as errors, so the driving loop can
    /// relay them to the agent and keep going.
    #[instrument(skip(self, cmd), fields(root = %self.root.display()))]
    pub async fn run(&self, cmd: &str, cwd: &Path, remaining_calls: u32) -> Result<ShellOutcome> {
        debug!("Running shell command: {:.50}", cmd);

        // The session cwd must itself be inside the sandbox. A stale or
        // deleted cwd falls back to the root rather than failing the call.
        let cwd = if guard::is_within(&self.root, cwd) {
            cwd.to_path_buf()
        } else {
            warn!("cwd {} is outside the sandbox, using root", cwd.display());
            self.root.clone()
        };

        // Capture the shell's exit code and final $PWD in the same process,
        // after the command has run. If the shell exits early (explicit
        // `exit`, syntax error, timeout) the sentinels are simply absent.
        let script = format!(
            "{cmd}\nprintf '\\n{RC_SENTINEL}%s\\n{CWD_SENTINEL}%s' \"$?\" \"$PWD\""
        );

        let child = Command::new("bash")
            .arg("-rc")
            .arg(&script)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MendError::Shell(format!("failed to spawn bash: {}", e)))?;

        let warning = self.budget_warning(remaining_calls);

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| MendError::Shell(format!("wait failed: {}", e)))?,
            Err(_) => {
                // kill_on_drop has already reaped the child.
                debug!("Shell command timed out after {:?}", self.timeout);
                return Ok(ShellOutcome {
                    output: format!(
                        "{}[command timed out after {}s]",
                        warning,
                        self.timeout.as_secs()
                    ),
                    cwd,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let (visible, exit_code, reported_cwd) = match parse_sentinels(&stdout) {
            Some((visible, rc, pwd)) => (visible.to_string(), rc, Some(PathBuf::from(pwd))),
            None => (stdout.clone(), output.status.code().unwrap_or(-1), None),
        };

        let mut text = visible;
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        if exit_code != 0 {
            debug!("Shell command failed with exit code {}", exit_code);
            let note = format!("[command failed with exit code {}]", exit_code);
            text = if text.trim().is_empty() {
                note
            } else {
                format!("{}\n{}", note, text)
            };
        }

        // Discard any directory move that leaves the sandbox and say so
        // instead of showing the command's own output.
        let next_cwd = match reported_cwd {
            Some(reported) if guard::is_within(&self.root, &reported) => reported,
            Some(reported) => {
                warn!("Blocked cd out of sandbox to {}", reported.display());
                return Ok(ShellOutcome {
                    output: format!("{}[cannot cd out of the sandbox]", warning),
                    cwd,
                });
            }
            None => cwd,
        };

        Ok(ShellOutcome {
            output: format!("{}{}", warning, self.truncate(&text)),
            cwd: next_cwd,
        })
    }

    /// Agent-facing warning line once the call budget runs low.
    fn budget_warning(&self, remaining_calls: u32) -> String {
        if remaining_calls == 1 {
            "[SYSTEM WARNING: Only 1 tool call remaining. Apply your patch in the next step!]\n"
                .to_string()
        } else if remaining_calls <= self.budget_warning_at {
            format!(
                "[SYSTEM WARNING: Only {} tool calls remaining. Apply your patch soon]\n",
                remaining_calls
            )
        } else {
            String::new()
        }
    }

    /// Hard-cap output length on a char boundary to bound context growth.
    fn truncate(&self, text: &str) -> String {
        if text.len() <= self.truncation_limit {
            return text.to_string();
        }
        let mut end = self.truncation_limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n[output truncated]", &text[..end])
    }
}

/// Split the sentinel tail off captured stdout.
///
/// Returns `(visible_output, exit_code, pwd)` when both sentinels are
/// present and well-formed.
fn parse_sentinels(stdout: &str) -> Option<(&str, i32, &str)> {
    let cwd_at = stdout.rfind(CWD_SENTINEL)?;
    let rc_at = stdout[..cwd_at].rfind(RC_SENTINEL)?;

    let rc_text = stdout[rc_at + RC_SENTINEL.len()..cwd_at].trim();
    let rc: i32 = rc_text.parse().ok()?;
    let pwd = &stdout[cwd_at + CWD_SENTINEL.len()..];

    // printf prefixes the sentinel block with exactly one newline of its
    // own; trailing newlines beyond that belong to the command's output.
    let before = &stdout[..rc_at];
    let visible = before.strip_suffix('\n').unwrap_or(before);
    Some((visible, rc, pwd))
}
