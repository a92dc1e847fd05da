// urlscrub-core/src/engine.rs
//! Defines the core CleaningEngine trait and related data structures.
//!
//! The `CleaningEngine` trait decouples the message pipeline from the way a
//! single URL is cleaned. The pipeline only ever asks an engine to clean one
//! URL at a time; how rules are selected and applied is the engine's concern.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;
use crate::stats::ScrubStats;

/// Result of cleaning a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOutcome {
    /// The URL after parameter stripping (equal to the input if nothing applied).
    pub url: String,
    /// True if any redirect pattern of the evaluated providers matched.
    pub is_redirect: bool,
}

/// A trait that defines the core functionality of a URL cleaning engine.
pub trait CleaningEngine: Send + Sync {
    /// Cleans one URL.
    ///
    /// Never fails: a pattern that errors while matching is logged and
    /// treated as not matching, so the worst case is an unmodified URL.
    ///
    /// # Arguments
    /// * `url` - The URL exactly as located in the message text.
    /// * `stats` - Shared counters updated with URL and parameter totals.
    fn clean(&self, url: &str, stats: &ScrubStats) -> CleanOutcome;

    /// Names of every provider eligible for `url`, in evaluation order.
    fn eligible_providers(&self, url: &str) -> Vec<String>;

    /// Returns a reference to the rule snapshot the engine reads.
    fn rule_set(&self) -> &RuleSet;
}
