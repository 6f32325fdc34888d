//! # mend-patch
//!
//! Literal search/replace patch engine for Mend.
//!
//! The patch format is deliberately non-fuzzy: no line-context matching, no
//! hunk offsets. A search string must occur exactly once in the target file;
//! anything else is a typed rejection surfaced back to the agent so it can
//! add disambiguating context and retry.

mod create;
mod engine;

pub use create::{create_file, CreateOutcome, CreateRejection};
pub use engine::{apply_patch, PatchOutcome, PatchRejection, PatchRequest};
