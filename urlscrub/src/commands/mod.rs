//! Subcommand implementations and the rule loading they share.

pub mod rules;
pub mod scrub;
pub mod stream;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use urlscrub_core::config::{DEFAULT_ALIAS_FILE, DEFAULT_CACHE_FILE, DEFAULT_OVERRIDE_FILE};
use urlscrub_core::{FileRuleSource, HttpRuleSource, RuleSource, RuleStore, RuleStoreConfig, RuleStoreHandle};

use crate::cli::RuleSourceArgs;

/// Default cache location: `<user cache dir>/urlscrub/clear_urls_rules.json`,
/// or the working directory when no cache dir is known.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("urlscrub").join(DEFAULT_CACHE_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE))
}

/// Maps the CLI rule options onto a store configuration.
pub fn store_config(args: &RuleSourceArgs) -> RuleStoreConfig {
    // A local base file is its own source of truth; caching it is pointless.
    let cache_path = if args.no_cache || args.base_rules.is_some() {
        None
    } else {
        Some(args.cache.clone().unwrap_or_else(default_cache_path))
    };
    RuleStoreConfig {
        cache_path,
        override_path: Some(args.overrides.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OVERRIDE_FILE))),
        alias_path: Some(args.aliases.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ALIAS_FILE))),
        fetch_timeout: Duration::from_secs(args.fetch_timeout),
        ..RuleStoreConfig::default()
    }
}

fn rule_source(args: &RuleSourceArgs, timeout: Duration) -> Arc<dyn RuleSource> {
    match &args.base_rules {
        Some(path) => Arc::new(FileRuleSource::new(path)),
        None => Arc::new(HttpRuleSource::new(args.rules_url.clone(), timeout)),
    }
}

/// Loads the initial rule set. Fails if no usable rule set can be built.
pub fn open_rules(args: &RuleSourceArgs) -> Result<RuleStoreHandle> {
    let config = store_config(args);
    debug!("Rule store configuration: {:?}", config);
    let source = rule_source(args, config.fetch_timeout);
    let description = source.describe();
    RuleStoreHandle::open(RuleStore::new(config), source)
        .with_context(|| format!("Failed to load rules from {}", description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn args(extra: &[&str]) -> RuleSourceArgs {
        let mut argv = vec!["urlscrub"];
        argv.extend_from_slice(extra);
        argv.push("rules");
        Cli::parse_from(argv).rules
    }

    #[test]
    fn test_local_base_file_disables_cache() {
        let config = store_config(&args(&["--base-rules", "rules.json"]));
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn test_explicit_paths_are_used() {
        let config = store_config(&args(&["--cache", "c.json", "--overrides", "o.json", "--aliases", "a.json"]));
        assert_eq!(config.cache_path, Some(PathBuf::from("c.json")));
        assert_eq!(config.override_path, Some(PathBuf::from("o.json")));
        assert_eq!(config.alias_path, Some(PathBuf::from("a.json")));
    }

    #[test]
    fn test_no_cache_flag() {
        assert!(store_config(&args(&["--no-cache"])).cache_path.is_none());
    }
}
