//! segmenter.rs - Locates URLs, spoilers and masked links in chat text.
//!
//! Every operation here is a stateless scan over the input. The lookaround
//! patterns run on `fancy-regex`; if one of them fails at runtime the
//! failure is logged and the pass ends early (a scan yields the matches
//! found so far, a rewrite returns its input unchanged).
//!
//! License: MIT OR APACHE 2.0

use std::borrow::Cow;

use log::warn;
use once_cell::sync::Lazy;

pub use crate::pattern::PatternMatch as Segment;

static URL_LOCATOR: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"https?://\S+\.\S+").expect("URL locator pattern is valid"));

/// A whole whitespace-free token that is a URL.
static URL_TOKEN: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^https?://\S+\.\S+$").expect("URL token pattern is valid"));

static SPOILER: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(r"\|\|(\s*?[\s\S]+?\s*)\|\|").expect("spoiler pattern is valid")
});

/// A URL immediately followed by another scheme, with no separator.
static CONNECTED_URL: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(r"https?://\S+?(?=https?://)").expect("connected URL pattern is valid")
});

/// `[label](url)` or `[label](<url>)`. Group 1 is the label, group 2 the
/// bracketed URL, group 3 the bare URL.
static MASKED_LINK: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(
        r"\[((?!\s*\])[\s\S]+?)\]\([\s　]*(?:<(https?://[^\s>]+)>?|(https?://\S+))[\s　]*\)",
    )
    .expect("masked link pattern is valid")
});

/// A `[label](url)` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedLink {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub url: String,
}

fn scan<'t>(re: &'static fancy_regex::Regex, what: &'static str, text: &'t str) -> impl Iterator<Item = Segment> + 't {
    re.captures_iter(text)
        .map_while(move |caps| match caps {
            Ok(caps) => Some(caps),
            Err(e) => {
                warn!("Stopped scanning for {}: {}", what, e);
                None
            }
        })
        .filter_map(|caps| Segment::from_captures(&caps))
}

fn rewrite<'t>(re: &fancy_regex::Regex, what: &'static str, text: &'t str, replacement: &str) -> Cow<'t, str> {
    match re.try_replacen(text, 0, replacement) {
        Ok(out) => out,
        Err(e) => {
            warn!("Failed to rewrite {}, leaving text unchanged: {}", what, e);
            Cow::Borrowed(text)
        }
    }
}

/// Every `http(s)://` URL in `text`, left to right.
pub fn locate_urls(text: &str) -> impl Iterator<Item = Segment> + '_ {
    URL_LOCATOR.find_iter(text).map(|m| Segment {
        start: m.start(),
        end: m.end(),
        groups: vec![Some(m.as_str().to_string())],
    })
}

/// Shortest `||…||` spans; group 1 is the interior.
pub fn locate_spoilers(text: &str) -> impl Iterator<Item = Segment> + '_ {
    scan(&SPOILER, "spoilers", text)
}

/// Rewrites every spoiler span to `|| inner ||` so the markers never touch a URL.
pub fn enforce_spoiler_padding(text: &str) -> Cow<'_, str> {
    rewrite(&SPOILER, "spoiler padding", text, "|| ${1} ||")
}

/// Replaces every spoiler span with its padded interior.
pub fn strip_spoiler_markup(text: &str) -> Cow<'_, str> {
    rewrite(&SPOILER, "spoiler markup", text, " ${1} ")
}

/// Every masked link with a non-blank label.
pub fn locate_masked_links(text: &str) -> impl Iterator<Item = MaskedLink> + '_ {
    scan(&MASKED_LINK, "masked links", text).filter_map(|seg| {
        let url = seg.group(2).or_else(|| seg.group(3))?.to_string();
        Some(MaskedLink {
            start: seg.start,
            end: seg.end,
            label: seg.group(1)?.to_string(),
            url,
        })
    })
}

/// Rewrites every masked link to `[label]( url )`, dropping angle brackets.
pub fn enforce_masked_link_padding(text: &str) -> Cow<'_, str> {
    rewrite(&MASKED_LINK, "masked link padding", text, "[${1}]( ${2}${3} )")
}

/// Inserts a space after any URL that runs straight into another one.
pub fn split_connected_urls(text: &str) -> Cow<'_, str> {
    rewrite(&CONNECTED_URL, "connected URLs", text, "${0} ")
}

/// True if, with spoiler markup removed, every non-blank line holds only
/// URLs separated by whitespace. Text without any URL is not pure.
pub fn is_pure_url_message(text: &str) -> bool {
    let despoiled = strip_spoiler_markup(text);
    let mut saw_url = false;
    for token in despoiled.lines().flat_map(str::split_whitespace) {
        if !URL_TOKEN.is_match(token) {
            return false;
        }
        saw_url = true;
    }
    saw_url
}
