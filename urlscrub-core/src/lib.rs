// urlscrub-core/src/lib.rs
//! # urlscrub Core Library
//!
//! `urlscrub-core` strips tracking parameters from URLs found in chat text.
//! It loads a layered provider rule set, locates URLs (including spoilered
//! and markdown-masked ones), cleans each distinct URL, and turns the
//! result into an annotated reply plus a decision about the original
//! message.
//!
//! The library does not talk to any chat service. A host passes in an
//! [`IncomingMessage`] and performs the returned [`Action`] itself.
//!
//! ## Modules
//!
//! * `config`: On-disk rule document shapes and [`RuleStoreConfig`].
//! * `pattern`: The [`Pattern`] capability compiled rules are held behind.
//! * `rules`: Compiled [`Provider`]s and the immutable [`RuleSet`] snapshot.
//! * `sanitizers`: Compiles rule documents into providers, with a shared pattern cache.
//! * `store`: Loads, caches, merges and refreshes the rule set.
//! * `engine`: Defines the [`CleaningEngine`] trait.
//! * `engines`: Concrete engines; [`RuleEngine`] applies a rule set.
//! * `segmenter`: Finds URLs, spoilers and masked links in text.
//! * `processed_url`: Per-message entries and the [`MessageReport`].
//! * `pipeline`: Runs one message through segmentation and cleaning.
//! * `reply`: Composes the reply text.
//! * `action`: Decides what happens to the original message.
//! * `stats`: Shared operation counters.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::path::Path;
//! use std::sync::Arc;
//! use urlscrub_core::{
//!     build_rule_set, on_incoming_message, Action, IncomingMessage, ReplyTarget, RuleDocument,
//!     RuleEngine, ScrubStats,
//! };
//!
//! fn main() -> Result<(), urlscrub_core::UrlScrubError> {
//!     let rules = RuleDocument::from_json(
//!         r#"{ "providers": { "globalRules": { "urlPattern": ".*", "rules": ["^utm_"] } } }"#,
//!         Path::new("inline"),
//!     )?;
//!     let engine = RuleEngine::new(Arc::new(build_rule_set(rules, None, None)?));
//!     let stats = ScrubStats::new();
//!
//!     let message = IncomingMessage::new("https://example.com/a?utm_source=x&b=1");
//!     let action = on_incoming_message(&message, &engine, &stats);
//!     assert_eq!(
//!         action,
//!         Action::EditReplyAndDeleteOriginal {
//!             text: "https://example.com/a?&b=1".to_string(),
//!             reply_to: ReplyTarget::Incoming,
//!         }
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Loading rules returns [`UrlScrubError`]. Processing a message never
//! fails: a pattern that errors at match time is logged and treated as not
//! matching.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod action;
pub mod config;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod pattern;
pub mod pipeline;
pub mod processed_url;
pub mod reply;
pub mod rules;
pub mod sanitizers;
pub mod segmenter;
pub mod stats;
pub mod store;

/// Re-exports the rule document shapes and store settings.
pub use config::{
    AliasDocument,
    RawAlias,
    RawProvider,
    RuleDocument,
    RuleStoreConfig,
    DEFAULT_RULES_URL,
    GLOBAL_RULES_KEY,
    MAX_PATTERN_LENGTH,
};

/// Re-exports the custom error type for clear error reporting.
pub use errors::UrlScrubError;

pub use pattern::{Pattern, PatternMatch, SharedPattern};
pub use rules::{Provider, RuleSet};

/// Re-exports the cleaning engine trait and its rule-driven implementation.
pub use engine::{CleanOutcome, CleaningEngine};
pub use engines::rule_engine::RuleEngine;

pub use store::{build_rule_set, FileRuleSource, HttpRuleSource, RuleSource, RuleStore, RuleStoreHandle};

pub use processed_url::{MessageReport, ProcessedUrl, UrlCounts};
pub use pipeline::process_message;
pub use reply::compose_reply;
pub use action::{decide_action, on_incoming_message, Action, IncomingMessage, MessageId, ReplyTarget, UserId};
pub use stats::{ScrubStats, StatsSnapshot};

// Advanced usage: direct access to the pattern compiler.
pub use sanitizers::compiler::{compile_document, get_or_compile_pattern, prune_pattern_cache};
