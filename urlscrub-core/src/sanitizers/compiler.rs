//! compiler.rs - Compiles raw rule documents into providers.
//!
//! Compiled patterns are memoised in a process-wide cache keyed by pattern
//! text, so a periodic refresh of an unchanged upstream document does not
//! pay for recompiling thousands of patterns. Compilation is all or nothing:
//! every failure in a document is collected and reported together, and no
//! partially compiled provider map is ever returned.
//!
//! License: MIT OR APACHE 2.0

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::debug;

use crate::config::{AliasDocument, RawProvider, RuleDocument, MAX_PATTERN_LENGTH};
use crate::errors::UrlScrubError;
use crate::pattern::{FancyPattern, SharedPattern};
use crate::rules::Provider;

lazy_static! {
    /// A thread-safe, global cache of compiled patterns keyed by their source text.
    static ref PATTERN_CACHE: RwLock<HashMap<String, SharedPattern>> = RwLock::new(HashMap::new());
}

/// Gets a compiled pattern from the cache or compiles and caches it.
pub fn get_or_compile_pattern(pattern: &str) -> Result<SharedPattern, fancy_regex::Error> {
    {
        let cache = PATTERN_CACHE.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(pattern) {
            return Ok(Arc::clone(hit));
        }
    }

    let compiled: SharedPattern = Arc::new(FancyPattern::compile(pattern)?);
    PATTERN_CACHE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(pattern.to_string(), Arc::clone(&compiled));
    Ok(compiled)
}

/// Drops every memoised pattern no rule set still holds. Returns how many
/// were removed.
pub fn prune_pattern_cache() -> usize {
    let mut cache = PATTERN_CACHE.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    let before = cache.len();
    cache.retain(|_, pattern| Arc::strong_count(pattern) > 1);
    before - cache.len()
}

/// Number of distinct patterns currently memoised.
pub fn cached_pattern_count() -> usize {
    PATTERN_CACHE
        .read()
        .map(|cache| cache.len())
        .unwrap_or_default()
}

/// Collects compile failures for one document.
#[derive(Default)]
struct ErrorSink {
    errors: Vec<UrlScrubError>,
}

impl ErrorSink {
    fn compile(&mut self, provider: &str, field: &'static str, pattern: &str) -> Option<SharedPattern> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            self.errors.push(UrlScrubError::PatternLengthExceeded(
                provider.to_string(),
                pattern.len(),
                MAX_PATTERN_LENGTH,
            ));
            return None;
        }
        match get_or_compile_pattern(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                self.errors.push(UrlScrubError::RuleCompile {
                    provider: provider.to_string(),
                    field,
                    pattern: pattern.to_string(),
                    source: Box::new(e),
                });
                None
            }
        }
    }

    fn compile_all(&mut self, provider: &str, field: &'static str, patterns: &[String]) -> Vec<SharedPattern> {
        patterns
            .iter()
            .filter_map(|p| self.compile(provider, field, p))
            .collect()
    }

    fn finish<T>(mut self, value: T) -> Result<T, UrlScrubError> {
        match self.errors.len() {
            0 => Ok(value),
            1 => Err(self.errors.remove(0)),
            n => {
                let joined = self
                    .errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(UrlScrubError::RuleSetInvalid(n, joined))
            }
        }
    }
}

fn compile_into(sink: &mut ErrorSink, name: &str, raw: &RawProvider) -> Provider {
    let url_pattern = if raw.url_pattern.is_empty() {
        None
    } else {
        sink.compile(name, "urlPattern", &raw.url_pattern)
    };
    Provider {
        name: name.to_string(),
        url_pattern,
        rules: sink.compile_all(name, "rules", &raw.rules),
        exceptions: sink.compile_all(name, "exceptions", &raw.exceptions),
        redirections: sink.compile_all(name, "redirections", &raw.redirections),
        aliases: Vec::new(),
    }
}

/// Compiles a single provider entry.
pub fn compile_provider(name: &str, raw: &RawProvider) -> Result<Provider, UrlScrubError> {
    let mut sink = ErrorSink::default();
    let provider = compile_into(&mut sink, name, raw);
    sink.finish(provider)
}

/// Compiles every provider of a rule document, keyed and ordered by name.
pub fn compile_document(doc: &RuleDocument) -> Result<BTreeMap<String, Provider>, UrlScrubError> {
    debug!("Starting compilation of {} provider(s).", doc.providers.len());
    let mut sink = ErrorSink::default();
    let providers = doc
        .providers
        .iter()
        .map(|(name, raw)| (name.clone(), compile_into(&mut sink, name, raw)))
        .collect::<BTreeMap<_, _>>();
    let providers = sink.finish(providers)?;
    debug!(
        "Finished compiling providers. Total compiled: {}, cached patterns: {}.",
        providers.len(),
        cached_pattern_count()
    );
    Ok(providers)
}

/// Compiles the alias table into `(target provider, pattern)` pairs in
/// alias-name order. Aliases whose target `is_known` rejects are skipped
/// before their pattern is compiled.
pub fn compile_aliases(
    doc: &AliasDocument,
    is_known: impl Fn(&str) -> bool,
) -> Result<Vec<(String, SharedPattern)>, UrlScrubError> {
    let mut sink = ErrorSink::default();
    let compiled = doc
        .aliases
        .iter()
        .filter(|(name, alias)| {
            let known = is_known(&alias.target_rule_name);
            if !known {
                debug!("Alias '{}' targets unknown provider '{}', skipping.", name, alias.target_rule_name);
            }
            known
        })
        .filter_map(|(name, alias)| {
            sink.compile(name, "alias urlPattern", &alias.url_pattern)
                .map(|p| (alias.target_rule_name.clone(), p))
        })
        .collect::<Vec<_>>();
    sink.finish(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawAlias;

    fn raw(url_pattern: &str, rules: &[&str]) -> RawProvider {
        RawProvider {
            url_pattern: url_pattern.to_string(),
            rules: rules.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_returns_shared_instance() {
        let a = get_or_compile_pattern(r"^compiler_cache_shared$").unwrap();
        let b = get_or_compile_pattern(r"^compiler_cache_shared$").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_url_pattern_compiles_to_no_gate() {
        let p = compile_provider("aliased_only", &raw("", &["ref"])).unwrap();
        assert!(p.url_pattern.is_none());
        assert_eq!(p.rules.len(), 1);
    }

    #[test]
    fn test_single_failure_is_reported_directly() {
        let err = compile_provider("broken", &raw(r"^https://(", &[])).unwrap_err();
        match err {
            UrlScrubError::RuleCompile { provider, field, .. } => {
                assert_eq!(provider, "broken");
                assert_eq!(field, "urlPattern");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_failures_in_a_document_are_collected() {
        let mut doc = RuleDocument::default();
        doc.providers.insert("ok".into(), raw(r"example\.com", &["utm_"]));
        doc.providers.insert("bad_one".into(), raw(r"(", &[]));
        doc.providers.insert("bad_two".into(), raw(r"fine", &["[unclosed"]));
        match compile_document(&doc).unwrap_err() {
            UrlScrubError::RuleSetInvalid(count, message) => {
                assert_eq!(count, 2);
                assert!(message.contains("bad_one"));
                assert!(message.contains("bad_two"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlong_pattern_is_rejected() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        let err = compile_provider("long", &raw(&long, &[])).unwrap_err();
        assert!(matches!(err, UrlScrubError::PatternLengthExceeded(_, _, _)));
    }

    #[test]
    fn test_aliases_keep_target_names() {
        let mut doc = AliasDocument::default();
        doc.aliases.insert(
            "mirror".into(),
            RawAlias {
                url_pattern: r"^https?://mirror\.example\.net".into(),
                target_rule_name: "example".into(),
            },
        );
        let compiled = compile_aliases(&doc, |_| true).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0, "example");
    }

    #[test]
    fn test_aliases_for_unknown_targets_are_not_compiled() {
        let mut doc = AliasDocument::default();
        doc.aliases.insert(
            "orphan".into(),
            RawAlias {
                url_pattern: r"^https://(".into(),
                target_rule_name: "missing".into(),
            },
        );
        doc.aliases.insert(
            "mirror".into(),
            RawAlias {
                url_pattern: r"^https?://mirror\.example\.net".into(),
                target_rule_name: "example".into(),
            },
        );
        let compiled = compile_aliases(&doc, |target| target == "example").unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0, "example");

        assert!(compile_aliases(&doc, |_| true).is_err());
    }

    #[test]
    fn test_prune_keeps_patterns_still_in_use() {
        let pattern = r"^compiler_prune_in_use$";
        let held = get_or_compile_pattern(pattern).unwrap();
        prune_pattern_cache();
        let again = get_or_compile_pattern(pattern).unwrap();
        assert!(Arc::ptr_eq(&held, &again));

        drop(held);
        drop(again);
        prune_pattern_cache();
        let cache = PATTERN_CACHE.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        assert!(!cache.contains_key(pattern));
    }
}
