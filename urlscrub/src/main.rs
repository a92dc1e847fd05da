// urlscrub/src/main.rs
//! urlscrub entry point.
//!
//! Parses the command line, initialises logging and dispatches to the
//! selected subcommand.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use urlscrub::cli::{Cli, Commands};
use urlscrub::commands::{rules::run_rules, scrub::run_scrub, stream::run_stream};
use urlscrub::logger;
use urlscrub::ui::output_format::error_msg;

fn run(args: Cli) -> Result<()> {
    match &args.command {
        Commands::Scrub(cmd) => run_scrub(&args.rules, cmd, args.quiet),
        Commands::Stream(cmd) => run_stream(&args.rules, cmd),
        Commands::Rules(cmd) => run_rules(&args.rules, cmd),
    }
}

fn main() {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let level = if args.quiet {
        Some(LevelFilter::Off)
    } else if args.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    if let Err(e) = run(args) {
        error_msg(format!("{:#}", e));
        std::process::exit(1);
    }
}
