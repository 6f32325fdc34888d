//! Unified error types for Mend

use thiserror::Error;

/// Unified error type for all Mend operations
#[derive(Error, Debug)]
pub enum MendError {
    // Sandbox errors
    #[error("Sandbox violation: {0}")]
    Sandbox(String),

    // Command runner errors
    #[error("Shell error: {0}")]
    Shell(String),

    // Git errors
    #[error("Git command failed: {0}")]
    Git(String),

    // Workspace errors
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Refusal to delete a directory outside the designated temp prefix.
    /// Fatal to the cleanup attempt, never downgraded to a warning.
    #[error("Refusing to delete outside temp prefix: {0}")]
    UnsafeCleanup(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using MendError
pub type Result<T> = std::result::Result<T, MendError>;
