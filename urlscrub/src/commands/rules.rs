//! `rules` command: rule set statistics and single-URL checks.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use urlscrub_core::{CleanOutcome, CleaningEngine, RuleSet, ScrubStats};

use crate::cli::{RuleSourceArgs, RulesCommand};
use crate::commands::open_rules;

#[derive(Debug, Serialize)]
pub struct RuleSetSummary {
    pub providers: usize,
    pub patterns: usize,
    pub global_rules: usize,
    pub loaded_at: String,
    pub digest: String,
}

impl RuleSetSummary {
    pub fn of(set: &RuleSet) -> Self {
        Self {
            providers: set.providers.len(),
            patterns: set.pattern_count(),
            global_rules: set.global_rules.rules.len(),
            loaded_at: set.loaded_at.to_rfc3339(),
            digest: set.source_digest.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UrlCheck {
    pub url: String,
    pub eligible_providers: Vec<String>,
    pub outcome: CleanOutcome,
}

pub fn check_url(engine: &dyn CleaningEngine, url: &str) -> UrlCheck {
    UrlCheck {
        url: url.to_string(),
        eligible_providers: engine.eligible_providers(url),
        outcome: engine.clean(url, &ScrubStats::new()),
    }
}

fn print_summary<W: Write>(out: &mut W, summary: &RuleSetSummary) -> io::Result<()> {
    writeln!(out, "Providers:    {}", summary.providers)?;
    writeln!(out, "Patterns:     {}", summary.patterns)?;
    writeln!(out, "Global rules: {}", summary.global_rules)?;
    writeln!(out, "Loaded at:    {}", summary.loaded_at)?;
    writeln!(out, "Digest:       {}", summary.digest)
}

fn print_check<W: Write>(out: &mut W, check: &UrlCheck) -> io::Result<()> {
    writeln!(out, "URL:       {}", check.url)?;
    match check.eligible_providers.as_slice() {
        [] => writeln!(out, "Providers: (none, global rules only)")?,
        [first, rest @ ..] if rest.is_empty() => writeln!(out, "Providers: {}", first)?,
        [first, rest @ ..] => writeln!(out, "Providers: {} (also eligible: {})", first, rest.join(", "))?,
    }
    writeln!(out, "Cleaned:   {}", check.outcome.url)?;
    writeln!(out, "Redirect:  {}", if check.outcome.is_redirect { "yes" } else { "no" })
}

pub fn run_rules(rules: &RuleSourceArgs, cmd: &RulesCommand) -> Result<()> {
    let handle = open_rules(rules)?;
    let engine = handle.engine();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cmd.check {
        Some(url) => {
            let check = check_url(&engine, url);
            if cmd.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&check).context("Failed to serialise check")?)?;
            } else {
                print_check(&mut out, &check)?;
            }
        }
        None => {
            let summary = RuleSetSummary::of(engine.rule_set());
            if cmd.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?)?;
            } else {
                print_summary(&mut out, &summary)?;
            }
        }
    }
    Ok(())
}
