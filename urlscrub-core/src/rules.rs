//! rules.rs - Compiled providers and the immutable rule-set snapshot.
//!
//! A [`RuleSet`] is built once by the rule store and then only read. Provider
//! evaluation order is the lexical order of provider keys, which makes the
//! first-eligible-provider selection independent of how the source document
//! happened to order its entries.
//!
//! License: MIT OR APACHE 2.0

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::GLOBAL_RULES_KEY;
use crate::pattern::{any_matches, matches_or_log, SharedPattern};

/// Named bundle of URL-matching and parameter-cleaning rules.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    /// Gate pattern. `None` means the provider can only be reached via aliases.
    pub url_pattern: Option<SharedPattern>,
    /// Patterns matched against parameter names.
    pub rules: Vec<SharedPattern>,
    pub exceptions: Vec<SharedPattern>,
    pub redirections: Vec<SharedPattern>,
    /// Extra URL patterns; all of them must match to route a URL here.
    pub aliases: Vec<SharedPattern>,
}

impl Provider {
    /// A provider with no patterns at all.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_pattern: None,
            rules: Vec::new(),
            exceptions: Vec::new(),
            redirections: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// True if the gate matches `url`, or every alias does (with at least one alias present).
    pub fn is_eligible(&self, url: &str) -> bool {
        if let Some(gate) = &self.url_pattern {
            if matches_or_log(gate.as_ref(), url) {
                return true;
            }
        }
        !self.aliases.is_empty()
            && self
                .aliases
                .iter()
                .all(|alias| matches_or_log(alias.as_ref(), url))
    }

    pub fn is_redirect(&self, url: &str) -> bool {
        any_matches(&self.redirections, url)
    }

    pub fn is_exception(&self, url: &str) -> bool {
        any_matches(&self.exceptions, url)
    }

    /// True if `param_name` matches any removal rule.
    pub fn strips_param(&self, param_name: &str) -> bool {
        any_matches(&self.rules, param_name)
    }

    /// Unions the rule, exception and redirection lists of `other` into `self`.
    ///
    /// Patterns already present (by source text) are not duplicated. The gate
    /// pattern of `self` is kept; `other`'s gate only fills an absent one.
    pub fn union_with(&mut self, other: Provider) {
        union_patterns(&mut self.rules, other.rules);
        union_patterns(&mut self.exceptions, other.exceptions);
        union_patterns(&mut self.redirections, other.redirections);
        if self.url_pattern.is_none() {
            self.url_pattern = other.url_pattern;
        }
    }

    pub fn pattern_count(&self) -> usize {
        usize::from(self.url_pattern.is_some())
            + self.rules.len()
            + self.exceptions.len()
            + self.redirections.len()
            + self.aliases.len()
    }
}

fn union_patterns(into: &mut Vec<SharedPattern>, from: Vec<SharedPattern>) {
    for pattern in from {
        if !into.iter().any(|p| p.as_str() == pattern.as_str()) {
            into.push(pattern);
        }
    }
}

/// Immutable snapshot of every provider plus the global rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub global_rules: Provider,
    /// Keyed by provider name; iteration order is evaluation order.
    pub providers: BTreeMap<String, Provider>,
    pub loaded_at: DateTime<Utc>,
    /// SHA-256 over the source documents this set was built from.
    pub source_digest: String,
}

impl RuleSet {
    /// Builds a rule set, moving a stray `globalRules` entry out of `providers`.
    pub fn new(mut global_rules: Provider, mut providers: BTreeMap<String, Provider>) -> Self {
        if let Some(stray) = providers.remove(GLOBAL_RULES_KEY) {
            global_rules.union_with(stray);
        }
        Self {
            global_rules,
            providers,
            loaded_at: Utc::now(),
            source_digest: String::new(),
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.source_digest = digest.into();
        self
    }

    pub fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    /// All providers eligible for `url`, in evaluation order.
    pub fn eligible_providers<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Provider> + 'a {
        self.providers.values().filter(move |p| p.is_eligible(url))
    }

    pub fn first_eligible(&self, url: &str) -> Option<&Provider> {
        self.providers.values().find(|p| p.is_eligible(url))
    }

    pub fn pattern_count(&self) -> usize {
        self.global_rules.pattern_count()
            + self.providers.values().map(Provider::pattern_count).sum::<usize>()
    }
}
