//! # mend-core
//!
//! Core types for the Mend code-repair harness.
//!
//! Mend lets a language model act as an autonomous code-repair agent:
//! it explores a cloned repository through a restricted shell, proposes
//! literal search/replace edits, and is scored on how close its working-tree
//! diff lands to a ground-truth fix.
//!
//! This crate holds the pieces every other crate shares:
//!
//! - The unified [`MendError`] type and [`Result`] alias
//! - [`SessionOptions`], the one options structure that parameterizes a
//!   session (tool-call budget, timeout, temperature, truncation)
//! - [`HarnessConfig`], harness-level settings loaded from `mend.toml`

mod config;
mod error;

pub use config::{HarnessConfig, SessionOptions};
pub use error::{MendError, Result};
