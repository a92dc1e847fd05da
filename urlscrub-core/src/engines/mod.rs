// urlscrub-core/src/engines/mod.rs
//! This module contains URL cleaning engine implementations.
//!
//! Each engine is a separate file within this directory and implements the
//! `CleaningEngine` trait.

pub mod rule_engine;
