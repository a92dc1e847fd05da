//! pattern.rs - The minimal matching capability rule patterns are held behind.
//!
//! Rule documents are written for a backtracking engine (lookaround and
//! backreferences show up in real-world provider lists), so the default
//! implementation is `fancy-regex`. Everything else in the crate only sees
//! the [`Pattern`] trait and never names the engine.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::errors::UrlScrubError;

/// A single match produced by [`Pattern::find_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub start: usize,
    pub end: usize,
    /// Capture groups; index 0 is the whole match.
    pub groups: Vec<Option<String>>,
}

impl PatternMatch {
    pub(crate) fn from_captures(caps: &fancy_regex::Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        Some(Self {
            start: whole.start(),
            end: whole.end(),
            groups: (0..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
        })
    }

    /// The whole matched text.
    pub fn as_str(&self) -> &str {
        self.group(0).unwrap_or_default()
    }

    /// Capture group `i`, if it participated in the match.
    pub fn group(&self, i: usize) -> Option<&str> {
        self.groups.get(i).and_then(|g| g.as_deref())
    }
}

/// Matching capability required from a compiled rule pattern.
pub trait Pattern: Send + Sync + fmt::Debug {
    /// The source text the pattern was compiled from.
    fn as_str(&self) -> &str;

    fn is_match(&self, text: &str) -> Result<bool, UrlScrubError>;

    fn find_all(&self, text: &str) -> Result<Vec<PatternMatch>, UrlScrubError>;
}

/// Compiled patterns are shared between rule-set snapshots.
pub type SharedPattern = Arc<dyn Pattern>;

/// Backtracking budget per match attempt before a pattern is reported as failed.
pub const BACKTRACK_LIMIT: usize = 1_000_000;

/// `fancy-regex` backed implementation of [`Pattern`].
#[derive(Debug)]
pub struct FancyPattern {
    regex: fancy_regex::Regex,
}

impl FancyPattern {
    pub fn compile(pattern: &str) -> Result<Self, fancy_regex::Error> {
        let regex = fancy_regex::RegexBuilder::new(pattern)
            .backtrack_limit(BACKTRACK_LIMIT)
            .build()?;
        Ok(Self { regex })
    }

    fn execution_error(&self, err: fancy_regex::Error) -> UrlScrubError {
        UrlScrubError::PatternExecution {
            pattern: self.regex.as_str().to_string(),
            message: err.to_string(),
        }
    }
}

impl Pattern for FancyPattern {
    fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn is_match(&self, text: &str) -> Result<bool, UrlScrubError> {
        self.regex.is_match(text).map_err(|e| self.execution_error(e))
    }

    fn find_all(&self, text: &str) -> Result<Vec<PatternMatch>, UrlScrubError> {
        let mut out = Vec::new();
        for caps in self.regex.captures_iter(text) {
            let caps = caps.map_err(|e| self.execution_error(e))?;
            out.extend(PatternMatch::from_captures(&caps));
        }
        Ok(out)
    }
}

/// Runs `pattern` against `text`, downgrading a runtime failure to "no match".
pub fn matches_or_log(pattern: &dyn Pattern, text: &str) -> bool {
    match pattern.is_match(text) {
        Ok(found) => found,
        Err(e) => {
            warn!("{}; treating as no match", e);
            false
        }
    }
}

/// True if any of `patterns` matches `text`. Failing patterns count as no match.
pub fn any_matches(patterns: &[SharedPattern], text: &str) -> bool {
    patterns.iter().any(|p| matches_or_log(p.as_ref(), text))
}
