//! stats.rs - Shared operation counters.
//!
//! One [`ScrubStats`] is created by the host and passed by reference into
//! every call that counts something. Counters are independent atomics, so
//! messages may be processed concurrently; a [`StatsSnapshot`] is the
//! serialisable view a persistence collaborator flushes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct ScrubStats {
    total_messages: AtomicU64,
    cleaned_messages: AtomicU64,
    total_urls: AtomicU64,
    cleaned_urls: AtomicU64,
    total_params: AtomicU64,
    cleaned_params: AtomicU64,
    redirects: AtomicU64,
    masks: AtomicU64,
}

/// Point-in-time copy of [`ScrubStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_messages: u64,
    pub cleaned_messages: u64,
    pub total_urls: u64,
    pub cleaned_urls: u64,
    pub total_params: u64,
    pub cleaned_params: u64,
    pub redirects: u64,
    pub masks: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ScrubStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the counters from a previously flushed snapshot.
    pub fn from_snapshot(s: StatsSnapshot) -> Self {
        Self {
            total_messages: AtomicU64::new(s.total_messages),
            cleaned_messages: AtomicU64::new(s.cleaned_messages),
            total_urls: AtomicU64::new(s.total_urls),
            cleaned_urls: AtomicU64::new(s.cleaned_urls),
            total_params: AtomicU64::new(s.total_params),
            cleaned_params: AtomicU64::new(s.cleaned_params),
            redirects: AtomicU64::new(s.redirects),
            masks: AtomicU64::new(s.masks),
        }
    }

    pub fn record_message(&self) {
        bump(&self.total_messages);
    }

    pub fn record_cleaned_message(&self) {
        bump(&self.cleaned_messages);
    }

    pub fn record_url(&self, cleaned: bool) {
        bump(&self.total_urls);
        if cleaned {
            bump(&self.cleaned_urls);
        }
    }

    pub fn record_param(&self, cleaned: bool) {
        bump(&self.total_params);
        if cleaned {
            bump(&self.cleaned_params);
        }
    }

    pub fn record_redirect(&self) {
        bump(&self.redirects);
    }

    pub fn record_mask(&self) {
        bump(&self.masks);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_messages: self.total_messages.load(Ordering::Relaxed),
            cleaned_messages: self.cleaned_messages.load(Ordering::Relaxed),
            total_urls: self.total_urls.load(Ordering::Relaxed),
            cleaned_urls: self.cleaned_urls.load(Ordering::Relaxed),
            total_params: self.total_params.load(Ordering::Relaxed),
            cleaned_params: self.cleaned_params.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            masks: self.masks.load(Ordering::Relaxed),
        }
    }
}
