//! processed_url.rs - Per-message URL entries and their aggregate counts.
//!
//! A [`MessageReport`] owns one [`ProcessedUrl`] per distinct raw URL found
//! in a message, stored in first-seen order. Entries are addressed by a
//! stable index looked up from the raw text, and later passes (mask,
//! spoiler) only set fields on an entry that already exists. Counts are
//! maintained on the mutating paths so they always agree with the entries.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;
use std::env;
use std::ops::Range;

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Full URLs may carry session tokens; debug logs shorten them unless this is set.
    static ref LOG_FULL_URLS: bool = env::var("URLSCRUB_LOG_FULL_URLS")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);
}

/// Number of characters of a URL kept in logs when full logging is off.
const LOGGED_URL_PREFIX: usize = 48;

/// Renders `url` for a log line, shortened unless `URLSCRUB_LOG_FULL_URLS` is set.
pub fn loggable_url(url: &str) -> String {
    if *LOG_FULL_URLS {
        return url.to_string();
    }
    // Drop the query first; that is where tokens live.
    let base = url.split_once('?').map_or(url, |(head, _)| head);
    let shortened: String = base.chars().take(LOGGED_URL_PREFIX).collect();
    if shortened.len() < url.len() {
        format!("{}[...]", shortened)
    } else {
        shortened
    }
}

/// One distinct URL found in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedUrl {
    /// The URL exactly as located in the message.
    pub raw: String,
    pub processed: String,
    pub is_spoiler: bool,
    pub is_redirect: bool,
    /// Label of the masked link pointing at this URL.
    pub mask: Option<String>,
}

impl ProcessedUrl {
    pub fn is_altered(&self) -> bool {
        self.processed != self.raw
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCounts {
    pub cleaned: usize,
    pub redirects: usize,
    pub masks: usize,
}

impl UrlCounts {
    pub fn total(&self) -> usize {
        self.cleaned + self.redirects + self.masks
    }
}

/// Everything the pipeline learned about one message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageReport {
    entries: Vec<ProcessedUrl>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Every located position of every entry, as (entry index, byte range).
    #[serde(skip)]
    occurrences: Vec<(usize, Range<usize>)>,
    counts: UrlCounts,
    /// True if the message holds anything besides URLs.
    pub not_pure_url: bool,
}

impl MessageReport {
    pub fn new(not_pure_url: bool) -> Self {
        Self {
            not_pure_url,
            ..Default::default()
        }
    }

    /// Adds a freshly cleaned URL. Returns `false` and changes nothing if
    /// `raw` is already present.
    pub fn insert(&mut self, raw: &str, processed: String, is_redirect: bool) -> bool {
        if self.index.contains_key(raw) {
            return false;
        }
        let entry = ProcessedUrl {
            raw: raw.to_string(),
            processed,
            is_spoiler: false,
            is_redirect,
            mask: None,
        };
        if entry.is_altered() {
            self.counts.cleaned += 1;
        }
        if entry.is_redirect {
            self.counts.redirects += 1;
        }
        self.index.insert(entry.raw.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, raw: &str) -> Option<&ProcessedUrl> {
        self.index.get(raw).map(|&i| &self.entries[i])
    }

    /// Attaches a mask label to the entry for `raw`. Returns `true` only
    /// when the entry exists and had no mask before.
    pub fn set_mask(&mut self, raw: &str, label: &str) -> bool {
        let Some(&i) = self.index.get(raw) else {
            debug!("Masked link target {} was not located as a URL.", loggable_url(raw));
            return false;
        };
        let entry = &mut self.entries[i];
        let first = entry.mask.is_none();
        entry.mask = Some(label.to_string());
        if first {
            self.counts.masks += 1;
        }
        first
    }

    /// Records that `raw` was located at `start..end`. Ignored if `raw`
    /// has no entry.
    pub fn record_occurrence(&mut self, raw: &str, start: usize, end: usize) {
        if let Some(&i) = self.index.get(raw) {
            self.occurrences.push((i, start..end));
        }
    }

    /// Marks every entry with at least one occurrence inside `start..end`.
    pub fn mark_spoilers_within(&mut self, start: usize, end: usize) {
        for (i, found) in &self.occurrences {
            if found.start >= start && found.end <= end {
                self.entries[*i].is_spoiler = true;
            }
        }
    }

    /// True if anything was cleaned, flagged as a redirect or masked.
    pub fn is_actionable(&self) -> bool {
        self.counts.total() > 0
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[ProcessedUrl] {
        &self.entries
    }

    pub fn counts(&self) -> UrlCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
