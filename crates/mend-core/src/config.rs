//! Configuration for repair sessions
//!
//! A single options structure parameterizes every session variant: tool-call
//! budget, command timeout, sampling temperature, and output truncation.
//! Harness-level settings load from `mend.toml` when present.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::Result;

/// Options for one exploration/repair session.
///
/// These are the knobs the driving loop passes down to the command runner
/// and patch engine. Truncation is a tunable, not a fixed constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Maximum number of tool calls the agent may issue
    #[serde(default = "default_tool_call_budget")]
    pub tool_call_budget: u32,

    /// Per-command timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature for the driving model
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum length of command output returned to the agent
    #[serde(default = "default_truncation_limit")]
    pub truncation_limit: usize,
}

/// Harness-level configuration
///
/// Loaded from `mend.toml` in the harness root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Session defaults
    #[serde(default)]
    pub session: SessionOptions,

    /// Remaining-call count at which budget warnings start
    #[serde(default = "default_budget_warning_at")]
    pub budget_warning_at: u32,
}

// Default value providers
fn default_tool_call_budget() -> u32 {
    20
}

fn default_timeout_secs() -> u64 {
    4
}

fn default_temperature() -> f32 {
    0.7
}

fn default_truncation_limit() -> usize {
    2000
}

fn default_budget_warning_at() -> u32 {
    5
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tool_call_budget: default_tool_call_budget(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            truncation_limit: default_truncation_limit(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            budget_warning_at: default_budget_warning_at(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `mend.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join("mend.toml");

        if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)
                .map_err(|e| crate::MendError::Config(format!("Failed to parse config file: {}", e)))?)
        } else {
            Ok(Self::default())
        }
    }
}
