//! # mend-sandbox
//!
//! Sandboxed repository exploration for Mend.
//!
//! This crate provides:
//! - Path guard: resolve-then-verify containment for every externally
//!   supplied path
//! - Shell runner: restricted read-only command execution with timeout,
//!   output truncation, and persistent working-directory state

mod guard;
mod shell;

pub use guard::{is_within, resolve_in_root};
pub use shell::{ShellOutcome, ShellRunner};
