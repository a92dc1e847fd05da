// urlscrub/src/cli.rs
//! This file defines the command-line interface (CLI) for the urlscrub application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use urlscrub_core::DEFAULT_RULES_URL;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "urlscrub",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Strip tracking parameters from links in chat messages",
    long_about = "urlscrub finds URLs in chat text, removes known tracking parameters using a layered ClearURLs-style rule set, flags known redirectors, and reports what a chat bot should do with the original message.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    #[command(flatten)]
    pub rules: RuleSourceArgs,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the rule layers are read from. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RuleSourceArgs {
    /// URL of the base rule document.
    #[arg(long = "rules-url", value_name = "URL", env = "URLSCRUB_RULES_URL", default_value = DEFAULT_RULES_URL, global = true)]
    pub rules_url: String,

    /// Read the base rule document from a local file instead of fetching it.
    #[arg(long = "base-rules", value_name = "FILE", env = "URLSCRUB_BASE_RULES", global = true)]
    pub base_rules: Option<PathBuf>,

    /// Cache file for the fetched base document (defaults to the user cache directory).
    #[arg(long = "cache", value_name = "FILE", env = "URLSCRUB_CACHE", global = true)]
    pub cache: Option<PathBuf>,

    /// Never read or write the rule cache.
    #[arg(long = "no-cache", global = true)]
    pub no_cache: bool,

    /// Local override document merged on top of the base rules.
    #[arg(long = "overrides", value_name = "FILE", env = "URLSCRUB_OVERRIDES", global = true)]
    pub overrides: Option<PathBuf>,

    /// Local alias table.
    #[arg(long = "aliases", value_name = "FILE", env = "URLSCRUB_ALIASES", global = true)]
    pub aliases: Option<PathBuf>,

    /// Timeout for fetching the base document, in seconds.
    #[arg(long = "fetch-timeout", value_name = "SECS", env = "URLSCRUB_FETCH_TIMEOUT", default_value_t = 30, global = true)]
    pub fetch_timeout: u64,
}

/// All available commands for the `urlscrub` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cleans a single message from a file or stdin.
    #[command(about = "Clean a single message read from a file or stdin.")]
    Scrub(ScrubCommand),

    /// Treats every stdin line as a message and prints one JSON action per line.
    #[command(about = "Process stdin line by line, printing one JSON action per message.")]
    Stream(StreamCommand),

    /// Inspects the loaded rule set.
    #[command(about = "Show rule set statistics or check how a URL would be cleaned.")]
    Rules(RulesCommand),
}

/// Arguments for the `scrub` command.
#[derive(Parser, Debug)]
pub struct ScrubCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read the message from a specified file instead of stdin.")]
    pub input: Option<PathBuf>,

    /// Treat the message as written by a bot.
    #[arg(long)]
    pub bot: bool,

    /// Treat the message as a reply to the message with this ID.
    #[arg(long = "reply-to", value_name = "ID")]
    pub reply_to: Option<u64>,

    /// A user mentioned by the message (repeatable).
    #[arg(long = "mention", value_name = "ID")]
    pub mentions: Vec<u64>,

    /// Print the decided action as JSON instead of the reply text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `stream` command.
#[derive(Parser, Debug)]
pub struct StreamCommand {
    /// Seconds between background rule refreshes.
    #[arg(long = "refresh-secs", value_name = "SECS", env = "URLSCRUB_REFRESH_SECS", default_value_t = 6 * 60 * 60)]
    pub refresh_secs: u64,

    /// Parse every line as a JSON message object instead of plain text.
    #[arg(long = "json-input")]
    pub json_input: bool,
}

/// Arguments for the `rules` command.
#[derive(Parser, Debug)]
pub struct RulesCommand {
    /// Show the eligible providers and cleaning result for this URL.
    #[arg(long, value_name = "URL")]
    pub check: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}
