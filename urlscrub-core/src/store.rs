//! store.rs - Loads, merges and serves the layered rule set.
//!
//! Three layers are combined into one [`RuleSet`]:
//!
//! 1. the base document, fetched from a [`RuleSource`] and cached on disk,
//! 2. an optional local override document unioned on top of it,
//! 3. an optional alias table routing extra URL shapes to providers.
//!
//! [`RuleStoreHandle`] keeps the live snapshot behind an `ArcSwap`. Readers
//! take one `Arc<RuleSet>` per message and never block a refresh; a refresh
//! either swaps in a complete new set or leaves the old one untouched.
//!
//! License: MIT OR APACHE 2.0

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};

use crate::config::{AliasDocument, RuleDocument, RuleStoreConfig, GLOBAL_RULES_KEY};
use crate::engines::rule_engine::RuleEngine;
use crate::errors::UrlScrubError;
use crate::rules::{Provider, RuleSet};
use crate::sanitizers::compiler::{compile_aliases, compile_document, prune_pattern_cache};

/// Where the base rule document comes from.
pub trait RuleSource: Send + Sync {
    /// Returns the raw JSON text of the base document.
    fn fetch(&self) -> Result<String, UrlScrubError>;

    /// Human-readable origin used in logs and error messages.
    fn describe(&self) -> String;
}

/// Fetches the base document over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRuleSource {
    url: String,
    timeout: Duration,
}

impl HttpRuleSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl RuleSource for HttpRuleSource {
    fn fetch(&self) -> Result<String, UrlScrubError> {
        // Built per call: a blocking client must not be created or dropped
        // inside an async context, and refreshes run on a blocking thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("urlscrub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UrlScrubError::RuleFetch(format!("could not build HTTP client: {e}")))?;

        debug!("Fetching rules from {}", self.url);
        let response = client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| UrlScrubError::RuleFetch(format!("{}: {}", self.url, e)))?;
        response
            .text()
            .map_err(|e| UrlScrubError::RuleFetch(format!("{}: {}", self.url, e)))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the base document from a local file.
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuleSource for FileRuleSource {
    fn fetch(&self) -> Result<String, UrlScrubError> {
        fs::read_to_string(&self.path)
            .map_err(|e| UrlScrubError::RuleFetch(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Raw text of all three layers plus their combined digest.
#[derive(Debug, Clone)]
pub struct RuleDocuments {
    pub base: RuleDocument,
    pub overrides: Option<RuleDocument>,
    pub aliases: Option<AliasDocument>,
    pub digest: String,
}

/// Loads rule documents according to a [`RuleStoreConfig`].
#[derive(Debug, Clone)]
pub struct RuleStore {
    config: RuleStoreConfig,
}

impl RuleStore {
    pub fn new(config: RuleStoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleStoreConfig {
        &self.config
    }

    /// Loads and compiles a complete rule set. Any failure is fatal.
    pub fn load(&self, source: &dyn RuleSource) -> Result<RuleSet, UrlScrubError> {
        let docs = self.load_documents(source, true)?;
        build_from_documents(docs)
    }

    /// Reads every layer without compiling anything.
    ///
    /// With `prefer_cache`, a cached base document younger than the TTL is
    /// used instead of the source. A failed fetch falls back to the cache
    /// at any age.
    pub fn load_documents(&self, source: &dyn RuleSource, prefer_cache: bool) -> Result<RuleDocuments, UrlScrubError> {
        let (base, base_text) = self.base_document(source, prefer_cache)?;

        let overrides = match &self.config.override_path {
            Some(path) => RuleDocument::load_optional(path)?,
            None => None,
        };
        let aliases = match &self.config.alias_path {
            Some(path) => AliasDocument::load_optional(path)?,
            None => None,
        };

        let digest = digest_layers(&[
            Some(base_text.as_str()),
            overrides.as_ref().map(|(_, text)| text.as_str()),
            aliases.as_ref().map(|(_, text)| text.as_str()),
        ]);

        Ok(RuleDocuments {
            base,
            overrides: overrides.map(|(doc, _)| doc),
            aliases: aliases.map(|(doc, _)| doc),
            digest,
        })
    }

    /// Resolves the base layer to a parsed document and its raw text.
    ///
    /// A fetched body that does not parse counts as a failed fetch. A cache
    /// file that does not parse is ignored.
    fn base_document(&self, source: &dyn RuleSource, prefer_cache: bool) -> Result<(RuleDocument, String), UrlScrubError> {
        let cache = self.config.cache_path.as_deref();

        if prefer_cache {
            if let Some(path) = cache {
                match cache_age(path) {
                    Some(age) if age < self.config.cache_ttl => {
                        if let Some(cached) = read_cache(path) {
                            info!("Using cached rules from {} ({}s old).", path.display(), age.as_secs());
                            return Ok(cached);
                        }
                    }
                    Some(age) => debug!("Cached rules at {} are stale ({}s old).", path.display(), age.as_secs()),
                    None => {}
                }
            }
        }

        let fetched = source.fetch().and_then(|text| {
            let origin = PathBuf::from(source.describe());
            RuleDocument::from_json(&text, &origin).map(|doc| (doc, text))
        });
        match fetched {
            Ok((doc, text)) => {
                info!("Fetched rules from {}.", source.describe());
                if let Some(path) = cache {
                    write_cache(path, &text);
                }
                Ok((doc, text))
            }
            Err(fetch_err) => match cache.and_then(|path| read_cache(path).map(|cached| (cached, path))) {
                Some((cached, path)) => {
                    warn!("{}; falling back to cached rules at {}.", fetch_err, path.display());
                    Ok(cached)
                }
                None => Err(fetch_err),
            },
        }
    }
}

fn read_cache(path: &Path) -> Option<(RuleDocument, String)> {
    let text = fs::read_to_string(path).ok()?;
    match RuleDocument::from_json(&text, path) {
        Ok(doc) => Some((doc, text)),
        Err(e) => {
            warn!("Ignoring unusable rule cache: {}", e);
            None
        }
    }
}

fn cache_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    // A timestamp in the future counts as brand new.
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}

fn write_cache(path: &Path, text: &str) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Could not create cache directory {}: {}", parent.display(), e);
            return;
        }
    }
    match fs::write(path, text) {
        Ok(()) => debug!("Wrote rule cache {}.", path.display()),
        Err(e) => warn!("Could not write rule cache {}: {}", path.display(), e),
    }
}

fn digest_layers(layers: &[Option<&str>]) -> String {
    let mut hasher = Sha256::new();
    for layer in layers {
        match layer {
            Some(text) => {
                hasher.update([1u8]);
                hasher.update(text.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hex::encode(hasher.finalize())
}

fn build_from_documents(docs: RuleDocuments) -> Result<RuleSet, UrlScrubError> {
    let digest = docs.digest;
    Ok(build_rule_set(docs.base, docs.overrides, docs.aliases)?.with_digest(digest))
}

/// Compiles and merges the three layers into one rule set.
pub fn build_rule_set(
    base: RuleDocument,
    overrides: Option<RuleDocument>,
    aliases: Option<AliasDocument>,
) -> Result<RuleSet, UrlScrubError> {
    let mut providers = compile_document(&base)?;
    let global = providers
        .remove(GLOBAL_RULES_KEY)
        .unwrap_or_else(|| Provider::empty(GLOBAL_RULES_KEY));
    let mut set = RuleSet::new(global, providers);

    if let Some(doc) = overrides {
        for (name, provider) in compile_document(&doc)? {
            if name == GLOBAL_RULES_KEY {
                set.global_rules.union_with(provider);
            } else if let Some(existing) = set.providers.get_mut(&name) {
                existing.union_with(provider);
            } else {
                debug!("Override adds provider '{}'.", name);
                set.providers.insert(name, provider);
            }
        }
    }

    if let Some(doc) = aliases {
        let compiled = compile_aliases(&doc, |target| set.providers.contains_key(target))?;
        for (target, pattern) in compiled {
            if let Some(provider) = set.providers.get_mut(&target) {
                provider.aliases.push(pattern);
            }
        }
    }

    info!(
        "Rule set ready: {} provider(s), {} pattern(s).",
        set.providers.len(),
        set.pattern_count()
    );
    Ok(set)
}

/// Shared owner of the live rule snapshot.
#[derive(Clone)]
pub struct RuleStoreHandle {
    store: Arc<RuleStore>,
    source: Arc<dyn RuleSource>,
    live: Arc<ArcSwap<RuleSet>>,
}

impl RuleStoreHandle {
    /// Performs the initial load. Fails if no usable rule set can be built.
    pub fn open(store: RuleStore, source: Arc<dyn RuleSource>) -> Result<Self, UrlScrubError> {
        let set = store.load(source.as_ref())?;
        Ok(Self {
            store: Arc::new(store),
            source,
            live: Arc::new(ArcSwap::from_pointee(set)),
        })
    }

    /// The current rule set. Hold it for the whole of one message.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.live.load_full()
    }

    /// An engine bound to the current snapshot.
    pub fn engine(&self) -> RuleEngine {
        RuleEngine::new(self.snapshot())
    }

    /// Refetches and rebuilds the rule set.
    ///
    /// Returns `Ok(true)` if a new snapshot was swapped in and `Ok(false)`
    /// if every layer was unchanged. On error the live snapshot is kept.
    pub fn refresh(&self) -> Result<bool, UrlScrubError> {
        let docs = self.store.load_documents(self.source.as_ref(), false)?;
        if docs.digest == self.live.load().source_digest {
            debug!("Rule documents unchanged, keeping current snapshot.");
            return Ok(false);
        }
        let set = build_from_documents(docs)?;
        info!("Swapping in refreshed rules ({} providers).", set.providers.len());
        self.live.store(Arc::new(set));
        let pruned = prune_pattern_cache();
        if pruned > 0 {
            debug!("Dropped {} compiled pattern(s) no longer in use.", pruned);
        }
        Ok(true)
    }

    /// Runs [`refresh`](Self::refresh) every `interval` on the tokio runtime.
    ///
    /// Must be called from within a runtime. The first refresh happens one
    /// full interval after the call.
    pub fn spawn_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let worker = handle.clone();
                match tokio::task::spawn_blocking(move || worker.refresh()).await {
                    Ok(Ok(true)) => info!("Rule refresh applied."),
                    Ok(Ok(false)) => debug!("Rule refresh found no changes."),
                    Ok(Err(e)) => warn!("Rule refresh failed, keeping previous rules: {}", e),
                    Err(e) => error!("Rule refresh task did not complete: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> RuleDocument {
        RuleDocument::from_json(json, Path::new("test")).unwrap()
    }

    const BASE: &str = r#"{
        "providers": {
            "globalRules": { "urlPattern": ".*", "rules": ["^utm_"] },
            "shop": { "urlPattern": "^https?://shop\\.example\\.com", "rules": ["^tag$"] }
        }
    }"#;

    #[test]
    fn test_override_unions_and_inserts() {
        let overrides = doc(r#"{
            "providers": {
                "globalRules": { "rules": ["^fbclid$"] },
                "shop": { "urlPattern": "^https?://shop\\.example\\.com", "rules": ["^tag$", "^ref$"], "exceptions": ["/checkout"] },
                "news": { "urlPattern": "^https?://news\\.example\\.org", "rules": ["^src$"] }
            }
        }"#);
        let set = build_rule_set(doc(BASE), Some(overrides), None).unwrap();

        let global: Vec<&str> = set.global_rules.rules.iter().map(|p| p.as_str()).collect();
        assert_eq!(global, vec!["^utm_", "^fbclid$"]);

        let shop = set.provider("shop").unwrap();
        let rules: Vec<&str> = shop.rules.iter().map(|p| p.as_str()).collect();
        assert_eq!(rules, vec!["^tag$", "^ref$"]);
        assert_eq!(shop.exceptions.len(), 1);

        assert!(set.provider("news").is_some());
        assert!(set.provider(GLOBAL_RULES_KEY).is_none());
    }

    #[test]
    fn test_aliases_attach_to_known_targets_only() {
        // The orphaned alias has a malformed pattern; it is skipped, not compiled.
        let aliases = AliasDocument::from_json(
            r#"{ "aliases": {
                "mirror": { "urlPattern": "^https?://mirror\\.example\\.net", "targetRuleName": "shop" },
                "ghost": { "urlPattern": "^https?://(ghost", "targetRuleName": "missing" }
            } }"#,
            Path::new("test"),
        )
        .unwrap();
        let set = build_rule_set(doc(BASE), None, Some(aliases)).unwrap();
        assert_eq!(set.provider("shop").unwrap().aliases.len(), 1);
        assert!(set.provider("missing").is_none());
    }

    #[test]
    fn test_bad_pattern_fails_whole_build() {
        let broken = doc(r#"{ "providers": { "bad": { "urlPattern": "(", "rules": ["[", "ok"] } } }"#);
        let err = build_rule_set(broken, None, None).unwrap_err();
        assert!(matches!(err, UrlScrubError::RuleSetInvalid(2, _)));
    }

    #[test]
    fn test_digest_distinguishes_missing_from_empty_layers() {
        let a = digest_layers(&[Some("{}"), None, None]);
        let b = digest_layers(&[Some("{}"), Some(""), None]);
        assert_ne!(a, b);
        assert_eq!(a, digest_layers(&[Some("{}"), None, None]));
        assert_eq!(a.len(), 64);
    }
}
