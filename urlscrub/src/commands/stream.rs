//! `stream` command: a long-running, line-per-message mode.
//!
//! Each stdin line is one message. Every message is handled against the
//! rule snapshot that is live when it arrives, while a background task
//! refreshes the rules on an interval. Ctrl-C or end of input stops the
//! loop and prints the counters to stderr.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use urlscrub_core::{on_incoming_message, Action, IncomingMessage, RuleStoreHandle, ScrubStats};

use crate::cli::{RuleSourceArgs, StreamCommand};
use crate::commands::open_rules;
use crate::ui::output_format::warn_msg;

/// Parses one input line into a message. Blank lines yield `None`.
pub fn parse_line(line: &str, json_input: bool) -> Result<Option<IncomingMessage>> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }
    if json_input {
        let message = serde_json::from_str(line).context("Invalid JSON message")?;
        return Ok(Some(message));
    }
    Ok(Some(IncomingMessage::new(line)))
}

fn handle_line(handle: &RuleStoreHandle, stats: &ScrubStats, line: &str, json_input: bool) -> Result<Option<Action>> {
    let Some(message) = parse_line(line, json_input)? else {
        return Ok(None);
    };
    let engine = handle.engine();
    Ok(Some(on_incoming_message(&message, &engine, stats)))
}

async fn stream_loop(handle: RuleStoreHandle, cmd: &StreamCommand, stats: &ScrubStats) -> Result<()> {
    let refresher = handle.spawn_refresh(Duration::from_secs(cmd.refresh_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            next = lines.next_line() => {
                let Some(line) = next.context("Failed to read from stdin")? else {
                    debug!("End of input.");
                    break;
                };
                match handle_line(&handle, stats, &line, cmd.json_input) {
                    Ok(Some(action)) => {
                        let json = serde_json::to_string(&action).context("Failed to serialise action")?;
                        let mut out = std::io::stdout().lock();
                        writeln!(out, "{}", json)?;
                        out.flush()?;
                    }
                    Ok(None) => {}
                    Err(e) => warn_msg(format!("Skipping line: {:#}", e)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping.");
                break;
            }
        }
    }

    refresher.abort();
    Ok(())
}

pub fn run_stream(rules: &RuleSourceArgs, cmd: &StreamCommand) -> Result<()> {
    // The initial load may use a blocking HTTP client, so it runs before
    // any runtime exists.
    let handle = open_rules(rules)?;
    let stats = ScrubStats::new();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(stream_loop(handle, cmd, &stats));
    // A pending stdin read or refresh must not hold up exit.
    runtime.shutdown_background();

    let snapshot = stats.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => warn!("Could not serialise counters: {}", e),
    }
    result
}
