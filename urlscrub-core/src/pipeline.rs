//! pipeline.rs - Runs one chat message through segmentation and cleaning.
//!
//! License: MIT OR APACHE 2.0

use log::debug;

use crate::engine::CleaningEngine;
use crate::processed_url::{loggable_url, MessageReport};
use crate::segmenter::{
    enforce_masked_link_padding, enforce_spoiler_padding, is_pure_url_message, locate_masked_links,
    locate_spoilers, locate_urls, split_connected_urls,
};
use crate::stats::ScrubStats;

/// Builds the report for `text`.
///
/// Never fails. When nothing was cleaned, redirected or masked the report
/// is returned without spoiler annotation and [`MessageReport::is_actionable`]
/// is false.
pub fn process_message(text: &str, engine: &dyn CleaningEngine, stats: &ScrubStats) -> MessageReport {
    let split = split_connected_urls(text);
    let mut report = MessageReport::new(!is_pure_url_message(&split));

    let spoiler_padded = enforce_spoiler_padding(&split);
    let padded = enforce_masked_link_padding(&spoiler_padded);

    for segment in locate_urls(&padded) {
        let raw = segment.as_str();
        if report.get(raw).is_none() {
            let outcome = engine.clean(raw, stats);
            if outcome.is_redirect {
                debug!("Found redirect: {}", loggable_url(raw));
                stats.record_redirect();
            }
            report.insert(raw, outcome.url, outcome.is_redirect);
        }
        report.record_occurrence(raw, segment.start, segment.end);
    }

    for link in locate_masked_links(&padded) {
        if report.set_mask(&link.url, &link.label) {
            stats.record_mask();
        }
    }

    if !report.is_actionable() {
        return report;
    }

    for span in locate_spoilers(&padded) {
        report.mark_spoilers_within(span.start, span.end);
    }
    report
}
