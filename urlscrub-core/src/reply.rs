//! reply.rs - Renders a message report as the annotated reply text.
//!
//! License: MIT OR APACHE 2.0

use crate::processed_url::{MessageReport, ProcessedUrl};

/// Separates a mask label from the URL it points at.
pub const MASK_SEPARATOR: &str = " ↔️ ";

/// Reply for a message whose only URL is an untouched redirect.
pub const REDIRECT_NOTICE: &str = "↪️ Redirect Found";

/// Appended to a reply line whose URL is a redirect.
pub const REDIRECT_SUFFIX: &str = " ↪️ Redirect";

const SPOILER_MARK: &str = "||";

fn spoiler_wrapped(text: String, is_spoiler: bool) -> String {
    if is_spoiler {
        format!("{SPOILER_MARK}{text}{SPOILER_MARK}")
    } else {
        text
    }
}

fn masked(entry: &ProcessedUrl) -> String {
    match &entry.mask {
        Some(label) => format!("{label}{MASK_SEPARATOR}{}", entry.processed),
        None => entry.processed.clone(),
    }
}

/// Composes the reply for `report`. An empty string means there is nothing
/// worth replying with.
pub fn compose_reply(report: &MessageReport) -> String {
    if let [only] = report.entries() {
        if !only.is_altered() {
            match (only.is_redirect, only.mask.is_some()) {
                (true, false) => return REDIRECT_NOTICE.to_string(),
                (false, true) => return spoiler_wrapped(masked(only), only.is_spoiler),
                _ => {}
            }
        }
    }

    let mut reply = String::new();
    for entry in report.entries() {
        if !(entry.is_altered() || entry.is_redirect || entry.mask.is_some()) {
            continue;
        }
        reply.push_str(&spoiler_wrapped(masked(entry), entry.is_spoiler));
        if entry.is_redirect {
            reply.push_str(REDIRECT_SUFFIX);
        }
        reply.push('\n');
    }
    reply.truncate(reply.trim_end_matches('\n').len());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Marks the entry for `raw` as posted inside a spoiler.
    fn spoilered(report: &mut MessageReport, raw: &str) {
        report.record_occurrence(raw, 3, 3 + raw.len());
        report.mark_spoilers_within(0, raw.len() + 6);
    }

    #[test]
    fn test_single_untouched_redirect_gives_notice() {
        let mut report = MessageReport::new(false);
        report.insert("https://r.example/go?u=1", "https://r.example/go?u=1".into(), true);
        assert_eq!(compose_reply(&report), REDIRECT_NOTICE);
    }

    #[test]
    fn test_single_mask_gives_label_and_url() {
        let mut report = MessageReport::new(true);
        report.insert("https://example.com/a", "https://example.com/a".into(), false);
        report.set_mask("https://example.com/a", "label");
        assert_eq!(compose_reply(&report), "label ↔️ https://example.com/a");
    }

    #[test]
    fn test_single_spoiler_mask_is_wrapped() {
        let mut report = MessageReport::new(true);
        report.insert("https://example.com/a", "https://example.com/a".into(), false);
        report.set_mask("https://example.com/a", "label");
        spoilered(&mut report, "https://example.com/a");
        assert_eq!(compose_reply(&report), "||label ↔️ https://example.com/a||");
    }

    #[test]
    fn test_lines_skip_untouched_entries_and_trim_newline() {
        let mut report = MessageReport::new(true);
        report.insert("https://a.example/x?si=1", "https://a.example/x".into(), false);
        report.insert("https://plain.example/", "https://plain.example/".into(), false);
        report.insert("https://r.example/go?utm_source=x&u=1", "https://r.example/go?&u=1".into(), true);
        spoilered(&mut report, "https://a.example/x?si=1");
        assert_eq!(
            compose_reply(&report),
            "||https://a.example/x||\nhttps://r.example/go?&u=1 ↪️ Redirect"
        );
    }

    #[test]
    fn test_redirect_suffix_sits_outside_spoiler() {
        let mut report = MessageReport::new(false);
        report.insert("https://r.example/go?si=1", "https://r.example/go".into(), true);
        spoilered(&mut report, "https://r.example/go?si=1");
        assert_eq!(compose_reply(&report), "||https://r.example/go|| ↪️ Redirect");
    }

    #[test]
    fn test_nothing_to_report_is_empty() {
        let mut report = MessageReport::new(false);
        report.insert("https://plain.example/", "https://plain.example/".into(), false);
        assert_eq!(compose_reply(&report), "");
    }
}
