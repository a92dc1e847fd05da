//! Configuration management for `urlscrub-core`.
//!
//! This module defines the on-disk shapes of the three rule sources (base
//! document, local override document, alias table) and the settings that
//! tell the rule store where to find them. Documents are JSON; unknown
//! fields are ignored so upstream provider lists can grow new keys freely.
//!
//! License: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::UrlScrubError;

/// Maximum allowed length for a single rule pattern string.
pub const MAX_PATTERN_LENGTH: usize = 4096;

/// Reserved provider key holding the rules applied to every URL.
pub const GLOBAL_RULES_KEY: &str = "globalRules";

/// Upstream provider list the cache is filled from.
pub const DEFAULT_RULES_URL: &str = "https://rules2.clearurls.xyz/data.minify.json";

pub const DEFAULT_CACHE_FILE: &str = "clear_urls_rules.json";
pub const DEFAULT_OVERRIDE_FILE: &str = "custom_rules.json";
pub const DEFAULT_ALIAS_FILE: &str = "aliases.json";

/// Cached base documents younger than this are used without refetching.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Interval between background rule refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One provider entry as written in a rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProvider {
    /// Gate pattern; an empty string means the provider is reachable only via aliases.
    pub url_pattern: String,
    pub rules: Vec<String>,
    pub exceptions: Vec<String>,
    pub redirections: Vec<String>,
}

/// Base and override documents share this schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub providers: BTreeMap<String, RawProvider>,
}

/// One alias entry: an extra URL shape routed to an existing provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlias {
    pub url_pattern: String,
    pub target_rule_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AliasDocument {
    #[serde(default)]
    pub aliases: BTreeMap<String, RawAlias>,
}

impl RuleDocument {
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, UrlScrubError> {
        serde_json::from_str(text).map_err(|source| UrlScrubError::RuleDocument {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads an optional local document. A missing file yields `Ok(None)`.
    pub fn load_optional(path: &Path) -> Result<Option<(Self, String)>, UrlScrubError> {
        let Some(text) = read_optional(path)? else {
            return Ok(None);
        };
        let doc = Self::from_json(&text, path)?;
        info!("Loaded {} override provider(s) from {}.", doc.providers.len(), path.display());
        Ok(Some((doc, text)))
    }
}

impl AliasDocument {
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, UrlScrubError> {
        serde_json::from_str(text).map_err(|source| UrlScrubError::RuleDocument {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads an optional alias table. A missing file yields `Ok(None)`.
    pub fn load_optional(path: &Path) -> Result<Option<(Self, String)>, UrlScrubError> {
        let Some(text) = read_optional(path)? else {
            return Ok(None);
        };
        let doc = Self::from_json(&text, path)?;
        info!("Loaded {} alias(es) from {}.", doc.aliases.len(), path.display());
        Ok(Some((doc, text)))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, UrlScrubError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Optional rule file {} not present, skipping.", path.display());
            Ok(None)
        }
        Err(e) => Err(UrlScrubError::IoError(e)),
    }
}

/// Where the rule store reads its three layers from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleStoreConfig {
    /// Cache file for the fetched base document. `None` disables caching.
    pub cache_path: Option<PathBuf>,
    /// Local override document merged on top of the base set.
    pub override_path: Option<PathBuf>,
    /// Local alias table.
    pub alias_path: Option<PathBuf>,
    /// Age after which the cached base document is refetched.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    #[serde(with = "duration_secs")]
    pub refresh_interval: Duration,
    /// Timeout applied to a single remote fetch.
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,
}

impl Default for RuleStoreConfig {
    fn default() -> Self {
        Self {
            cache_path: Some(PathBuf::from(DEFAULT_CACHE_FILE)),
            override_path: Some(PathBuf::from(DEFAULT_OVERRIDE_FILE)),
            alias_path: Some(PathBuf::from(DEFAULT_ALIAS_FILE)),
            cache_ttl: DEFAULT_CACHE_TTL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl RuleStoreConfig {
    /// A configuration with no cache and no local layers.
    pub fn base_only() -> Self {
        Self {
            cache_path: None,
            override_path: None,
            alias_path: None,
            ..Self::default()
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_document_ignores_unknown_fields() {
        let json = r#"{
            "providers": {
                "example": {
                    "urlPattern": "^https?://example\\.com",
                    "completeProvider": false,
                    "rules": ["ref"],
                    "rawRules": ["/ref_[a-z]+"]
                }
            }
        }"#;
        let doc = RuleDocument::from_json(json, Path::new("inline")).unwrap();
        let p = &doc.providers["example"];
        assert_eq!(p.rules, vec!["ref".to_string()]);
        assert!(p.exceptions.is_empty());
        assert!(p.redirections.is_empty());
    }

    #[test]
    fn test_malformed_document_names_its_origin() {
        let err = RuleDocument::from_json("{ not json", Path::new("custom_rules.json")).unwrap_err();
        assert!(err.to_string().contains("custom_rules.json"));
    }

    #[test]
    fn test_store_config_round_trips_ttl_as_seconds() {
        let cfg = RuleStoreConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"cache_ttl\":21600"));
        let back: RuleStoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
