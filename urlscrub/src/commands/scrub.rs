//! `scrub` command: one message in, one reply or action out.

use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use log::info;

use urlscrub_core::{on_incoming_message, Action, IncomingMessage, MessageId, ScrubStats, UserId};

use crate::cli::{RuleSourceArgs, ScrubCommand};
use crate::commands::open_rules;
use crate::ui::output_format::info_msg;

fn read_input(cmd: &ScrubCommand) -> Result<String> {
    match &cmd.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            Ok(buf)
        }
    }
}

/// Builds the message the command describes.
pub fn build_message(text: String, cmd: &ScrubCommand) -> IncomingMessage {
    IncomingMessage {
        text,
        author_is_bot: cmd.bot,
        is_reply: cmd.reply_to.is_some(),
        reply_target: cmd.reply_to.map(MessageId),
        mentioned_users: cmd.mentions.iter().copied().map(UserId).collect(),
    }
}

pub fn run_scrub(rules: &RuleSourceArgs, cmd: &ScrubCommand, quiet: bool) -> Result<()> {
    let input = read_input(cmd)?;
    // Trailing newlines come from files and heredocs, not from the message.
    let text = input.trim_end_matches(['\r', '\n']).to_string();
    let message = build_message(text, cmd);

    let handle = open_rules(rules)?;
    let engine = handle.engine();
    let stats = ScrubStats::new();
    let action = on_incoming_message(&message, &engine, &stats);
    info!("Decided action: {:?}", action);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cmd.json {
        let json = serde_json::to_string_pretty(&action).context("Failed to serialise action")?;
        writeln!(out, "{}", json)?;
        return Ok(());
    }

    match &action {
        Action::NoAction => {
            if !quiet {
                info_msg("Nothing to clean.");
            }
        }
        Action::EditToSuppressPreview => {
            if !quiet {
                info_msg("Link previews would be suppressed; no reply needed.");
            }
        }
        Action::EditAndReply { text, .. } | Action::EditReplyAndDeleteOriginal { text, .. } => {
            writeln!(out, "{}", text)?;
            if !quiet && action.deletes_original() {
                info_msg("The original message would be replaced.");
            }
        }
    }
    Ok(())
}
