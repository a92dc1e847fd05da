//! errors.rs - Custom error types for the urlscrub-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR APACHE 2.0

use std::path::PathBuf;
use thiserror::Error;

/// This enum represents all possible error types in the `urlscrub-core` library.
///
/// Load-time variants (`RuleCompile`, `RuleSetInvalid`, `RuleFetch`,
/// `RuleDocument`) are fatal when building the first rule set. At refresh
/// time they are logged and the previous snapshot stays live.
/// `PatternExecution` is raised by the pattern layer while matching and is
/// downgraded to "no match" by every caller in the message pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UrlScrubError {
    #[error("Failed to compile {field} pattern '{pattern}' for provider '{provider}': {source}")]
    RuleCompile {
        provider: String,
        field: &'static str,
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("Failed to compile {0} rule pattern(s):\n{1}")]
    RuleSetInvalid(usize, String),

    #[error("Provider '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Rule document unavailable: {0}")]
    RuleFetch(String),

    #[error("Malformed rule document {path}: {source}")]
    RuleDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pattern '{pattern}' failed while matching: {message}")]
    PatternExecution { pattern: String, message: String },

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}
