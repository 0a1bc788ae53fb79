//! Usage, help, and diagnostic rendering.
//!
//! Headers, usage lines, and invitations go to the diagnostic stream; the
//! rows of a command listing go to the output stream so they can be piped.

use std::io::{self, Write};

use crate::namespace::Namespace;
use crate::style::Palette;
use crate::tree::Node;

const INDENT: &str = "  ";

pub(crate) fn write_invite(
    palette: &Palette,
    invocation: &str,
    err: &mut dyn Write,
) -> io::Result<()> {
    writeln!(
        err,
        "Try {} for help.",
        palette.hi(&format!("{invocation} -h"))
    )
}

pub(crate) fn write_usage(
    palette: &Palette,
    usage_string: &str,
    invocation: &str,
    msg: Option<&str>,
    err: &mut dyn Write,
) -> io::Result<()> {
    if let Some(msg) = msg {
        writeln!(err, "{msg}")?;
    }
    writeln!(err, "{usage_string}")?;
    write_invite(palette, invocation, err)
}

pub(crate) fn write_version(
    palette: &Palette,
    program_name: &str,
    version: Option<&str>,
    err: &mut dyn Write,
) -> io::Result<()> {
    let banner = match version {
        Some(version) => format!("{program_name} {version}"),
        None => program_name.to_string(),
    };
    writeln!(err, "{}", palette.hi(&banner))
}

pub(crate) fn unrecognized_message(palette: &Palette, given: &str, expecting: &str) -> String {
    format!(
        "Unrecognized command: {given:?}. Expecting: {}",
        palette.hi(expecting)
    )
}

pub(crate) fn ambiguous_message(palette: &Palette, given: &str, candidates: &[&Node]) -> String {
    let names: Vec<String> = candidates.iter().map(|c| palette.hi(c.name())).collect();
    format!(
        "Ambiguous command: {given:?}. Did you mean {}?",
        names.join(" or ")
    )
}

pub(crate) fn ignoring_message(palette: &Palette, leftovers: &[String]) -> String {
    let quoted: Vec<String> = leftovers.iter().map(|arg| format!("{arg:?}")).collect();
    format!("({} {})", palette.hi("ignoring:"), quoted.join(", "))
}

/// Writes a namespace's help screen: its options, then its commands.
pub(crate) fn write_help(
    palette: &Palette,
    namespace: &Namespace,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    let options = namespace.option_parser().render();
    write!(err, "{options}")?;
    if !options.ends_with('\n') {
        writeln!(err)?;
    }

    let children = namespace.children();
    if children.is_empty() {
        return Ok(());
    }

    writeln!(err, "{}", palette.hi("commands:"))?;
    let rows: Vec<(&str, Vec<String>)> = children.iter().map(|c| (c.name(), c.summary())).collect();
    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);

    for (name, lines) in &rows {
        let first = lines.first().map(String::as_str).unwrap_or("");
        writeln!(
            out,
            "{INDENT}{}{first}",
            palette.hi(&format!("{name:>width$}  "))
        )?;
        for line in lines.iter().skip(1) {
            writeln!(out, "{INDENT}{:width$}  {line}", "")?;
        }
    }

    writeln!(
        err,
        "Try {} for command help.",
        palette.hi(&format!("{} [cmd] -h", namespace.invocation()))
    )
}
