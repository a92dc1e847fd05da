//! Styled status messages on stderr.
//!
//! Colour is applied only when the target is a terminal; callers pass that
//! decision in so tests can capture plain text.

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

fn write_tagged<W: Write>(writer: &mut W, tag: &str, msg: &str, color: Option<owo_colors::AnsiColors>) -> io::Result<()> {
    match color {
        Some(c) => writeln!(writer, "{} {}", tag.color(c).bold(), msg),
        None => writeln!(writer, "{} {}", tag, msg),
    }
}

pub fn print_info_message<W: Write>(writer: &mut W, msg: &str, supports_color: bool) -> io::Result<()> {
    write_tagged(writer, "[info]", msg, supports_color.then_some(owo_colors::AnsiColors::Cyan))
}

pub fn print_warn_message<W: Write>(writer: &mut W, msg: &str, supports_color: bool) -> io::Result<()> {
    write_tagged(writer, "[warn]", msg, supports_color.then_some(owo_colors::AnsiColors::Yellow))
}

pub fn print_error_message<W: Write>(writer: &mut W, msg: &str, supports_color: bool) -> io::Result<()> {
    write_tagged(writer, "[error]", msg, supports_color.then_some(owo_colors::AnsiColors::Red))
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>) {
    let _ = print_info_message(&mut io::stderr(), msg.as_ref(), io::stderr().is_terminal());
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>) {
    let _ = print_warn_message(&mut io::stderr(), msg.as_ref(), io::stderr().is_terminal());
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>) {
    let _ = print_error_message(&mut io::stderr(), msg.as_ref(), io::stderr().is_terminal());
}
