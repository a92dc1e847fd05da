//! Turns raw rule documents into compiled, shareable providers.
//!
//! Compilation is the only place pattern strings from rule documents are
//! validated; everything downstream works with already-compiled patterns.

pub mod compiler;
