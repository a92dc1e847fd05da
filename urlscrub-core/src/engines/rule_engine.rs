//! A `CleaningEngine` implementation driven by a layered provider rule set.
//!
//! Evaluation per URL: the first eligible provider (lexical key order) gets
//! one pass, then the global rules get one pass on the result. A pass tests
//! redirect patterns, stops at any exception, and otherwise removes every
//! `key=value` parameter whose key matches a removal rule.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::engine::{CleanOutcome, CleaningEngine};
use crate::processed_url::loggable_url;
use crate::rules::{Provider, RuleSet};
use crate::stats::ScrubStats;

/// Locates `?key=value` / `&key=value` tokens; group 1 is the key.
static PARAM_EXTRACTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&](\w+)=([\w\-.*=]+)").expect("parameter extractor pattern is valid")
});

#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<RuleSet>,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    fn apply_provider(provider: &Provider, url: String, is_redirect: &mut bool, stats: &ScrubStats) -> String {
        if provider.is_redirect(&url) {
            debug!("Provider '{}' flags redirect: {}", provider.name, loggable_url(&url));
            *is_redirect = true;
        }
        if provider.is_exception(&url) {
            debug!("Provider '{}' exception matched, leaving parameters.", provider.name);
            return url;
        }
        strip_params(provider, &url, stats)
    }
}

fn strip_params(provider: &Provider, url: &str, stats: &ScrubStats) -> String {
    let tokens: Vec<(&str, &str)> = PARAM_EXTRACTOR
        .captures_iter(url)
        .filter_map(|caps| Some((caps.get(0)?.as_str(), caps.get(1)?.as_str())))
        .collect();

    let mut out = url.to_string();
    for (token, name) in tokens {
        let strip = provider.strips_param(name);
        stats.record_param(strip);
        if !strip {
            continue;
        }
        // A leading '?' still introduces whatever parameters follow.
        let replacement = if token.starts_with('?') { "?" } else { "" };
        out = out.replacen(token, replacement, 1);
        debug!("Provider '{}' removed parameter '{}'.", provider.name, name);
    }
    out
}

impl CleaningEngine for RuleEngine {
    fn clean(&self, url: &str, stats: &ScrubStats) -> CleanOutcome {
        let mut is_redirect = false;
        let mut processed = url.to_string();

        let mut eligible = self.rules.eligible_providers(url);
        if let Some(provider) = eligible.next() {
            let shadowed: Vec<&str> = eligible.map(|p| p.name.as_str()).collect();
            if !shadowed.is_empty() {
                warn!(
                    "Ambiguous providers for {}: using '{}', also eligible {:?}",
                    loggable_url(url),
                    provider.name,
                    shadowed
                );
            }
            processed = Self::apply_provider(provider, processed, &mut is_redirect, stats);
        }

        processed = Self::apply_provider(&self.rules.global_rules, processed, &mut is_redirect, stats);

        let changed = processed != url;
        if changed && processed.ends_with('?') {
            processed.pop();
        }
        stats.record_url(changed);
        if changed {
            debug!("Cleaned: {} -> {}", loggable_url(url), loggable_url(&processed));
        }

        CleanOutcome { url: processed, is_redirect }
    }

    fn eligible_providers(&self, url: &str) -> Vec<String> {
        self.rules
            .eligible_providers(url)
            .map(|p| p.name.clone())
            .collect()
    }

    fn rule_set(&self) -> &RuleSet {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AliasDocument, RuleDocument};
    use crate::store::build_rule_set;
    use std::path::Path;

    const RULES: &str = r#"{
        "providers": {
            "globalRules": {
                "urlPattern": ".*",
                "rules": ["^utm_", "fbclid"],
                "redirections": ["^https?://l\\.example\\.net/\\?u="]
            },
            "video": {
                "urlPattern": "^https?://(?:www\\.)?video\\.example\\.com",
                "rules": ["^si$", "^feature$"],
                "exceptions": ["/embed/"],
                "redirections": ["^https?://(?:www\\.)?video\\.example\\.com/redirect\\?"]
            },
            "alpha": {
                "urlPattern": "^https?://shared\\.example\\.org",
                "rules": ["^a$"]
            },
            "zeta": {
                "urlPattern": "^https?://shared\\.example\\.org",
                "rules": ["^z$"]
            },
            "shop": {
                "urlPattern": "^https?://shop\\.example\\.com",
                "rules": ["^tag$"]
            }
        }
    }"#;

    const ALIASES: &str = r#"{
        "aliases": {
            "shop-mirror": { "urlPattern": "^https?://mirror\\.example\\.net/shop", "targetRuleName": "shop" }
        }
    }"#;

    fn engine() -> RuleEngine {
        let base = RuleDocument::from_json(RULES, Path::new("test")).unwrap();
        let aliases = AliasDocument::from_json(ALIASES, Path::new("test")).unwrap();
        RuleEngine::new(Arc::new(build_rule_set(base, None, Some(aliases)).unwrap()))
    }

    fn clean(url: &str) -> CleanOutcome {
        engine().clean(url, &ScrubStats::new())
    }

    #[test]
    fn test_global_rule_strips_leading_param_and_keeps_question_mark() {
        let out = clean("https://example.com/a?utm_source=x&b=1");
        assert_eq!(out.url, "https://example.com/a?&b=1");
        assert!(!out.is_redirect);
    }

    #[test]
    fn test_provider_rules_and_global_rules_both_apply() {
        let out = clean("https://www.video.example.com/live/abc?si=xyz&t=10&utm_medium=social");
        assert_eq!(out.url, "https://www.video.example.com/live/abc?&t=10");
    }

    #[test]
    fn test_dangling_question_mark_is_dropped_after_change() {
        let out = clean("https://www.video.example.com/live/abc?si=xyz");
        assert_eq!(out.url, "https://www.video.example.com/live/abc");
    }

    #[test]
    fn test_unchanged_url_keeps_trailing_question_mark() {
        let out = clean("https://example.com/search?");
        assert_eq!(out.url, "https://example.com/search?");
    }

    #[test]
    fn test_exception_skips_provider_but_not_global_rules() {
        let out = clean("https://video.example.com/embed/abc?si=keep&fbclid=drop");
        assert_eq!(out.url, "https://video.example.com/embed/abc?si=keep");
    }

    #[test]
    fn test_url_matching_no_provider_still_gets_global_rules() {
        let out = clean("https://unlisted.example/page?fbclid=abc&id=3");
        assert_eq!(out.url, "https://unlisted.example/page?&id=3");
    }

    #[test]
    fn test_only_first_eligible_provider_runs() {
        let e = engine();
        let out = e.clean("https://shared.example.org/x?a=1&z=2", &ScrubStats::new());
        assert_eq!(out.url, "https://shared.example.org/x?&z=2");
        assert_eq!(e.eligible_providers("https://shared.example.org/x"), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_redirects_are_flagged_by_provider_and_global_rules() {
        assert!(clean("https://www.video.example.com/redirect?q=https%3A%2F%2Fother.example").is_redirect);
        assert!(clean("https://l.example.net/?u=https%3A%2F%2Fother.example").is_redirect);
        assert!(!clean("https://www.video.example.com/watch?v=1").is_redirect);
    }

    #[test]
    fn test_alias_routes_to_target_provider() {
        let out = clean("https://mirror.example.net/shop/item?tag=aff-20&color=red");
        assert_eq!(out.url, "https://mirror.example.net/shop/item?&color=red");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let e = engine();
        let stats = ScrubStats::new();
        for url in [
            "https://example.com/a?utm_source=x&b=1",
            "https://www.video.example.com/live/abc?si=xyz&feature=share&utm_campaign=c",
            "https://shop.example.com/p?tag=1&tag=1&x=2",
            "https://unlisted.example/?fbclid=a%20b&utm_term=t",
            "https://shared.example.org/x?z=2&a=1",
            "https://example.com/plain",
        ] {
            let once = e.clean(url, &stats).url;
            let twice = e.clean(&once, &stats).url;
            assert_eq!(once, twice, "not idempotent for {url}");
        }
    }

    #[test]
    fn test_counters_track_params_and_urls() {
        let e = engine();
        let stats = ScrubStats::new();
        e.clean("https://unlisted.example/page?fbclid=abc&id=3", &stats);
        let snap = stats.snapshot();
        assert_eq!(snap.total_urls, 1);
        assert_eq!(snap.cleaned_urls, 1);
        assert_eq!(snap.total_params, 2);
        assert_eq!(snap.cleaned_params, 1);
    }

    #[test]
    fn test_failing_provider_gate_still_gets_global_rules() {
        let rules = r#"{
            "providers": {
                "globalRules": { "urlPattern": ".*", "rules": ["^utm_"] },
                "runaway": { "urlPattern": "^https://slow\\.example/(a+)+\\1$", "rules": ["^x$"] }
            }
        }"#;
        let base = RuleDocument::from_json(rules, Path::new("test")).unwrap();
        let e = RuleEngine::new(Arc::new(build_rule_set(base, None, None).unwrap()));
        let url = format!("https://slow.example/{}b?utm_source=1&x=2", "a".repeat(40));

        assert!(e.eligible_providers(&url).is_empty());
        let out = e.clean(&url, &ScrubStats::new());
        assert_eq!(out.url, format!("https://slow.example/{}b?&x=2", "a".repeat(40)));
        assert!(!out.is_redirect);
    }
}
