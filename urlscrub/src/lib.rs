// urlscrub/src/lib.rs
//! # urlscrub CLI Application
//!
//! This crate provides the command-line front-end for `urlscrub-core`:
//! one-shot message cleaning, a line-streaming mode with periodic rule
//! refresh, and rule set inspection.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
