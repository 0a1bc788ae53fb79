//! The receiver context for handlers and namespace actions.

use std::any::Any;
use std::io::{self, Write};

use crate::cli::Cli;
use crate::help;
use crate::namespace::Namespace;
use crate::style::Palette;

/// What a handler (or a namespace-level flag action) runs against.
///
/// The receiver is the namespace that owns the command being run. Through it a
/// handler reaches the namespace's services (and those of every enclosing
/// namespace), its invocation string for messages, the help/usage helpers,
/// and the two output streams of the current run.
pub struct Scope<'a> {
    cli: &'a Cli,
    lineage: Vec<&'a Namespace>,
    namespace: &'a Namespace,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
}

impl<'a> Scope<'a> {
    /// `lineage` runs from the root to the receiving namespace.
    pub(crate) fn new(
        cli: &'a Cli,
        lineage: Vec<&'a Namespace>,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
    ) -> Self {
        let namespace = lineage.last().copied().unwrap_or_else(|| cli.root());
        Self {
            cli,
            lineage,
            namespace,
            out,
            err,
        }
    }

    /// The standard output stream of this run.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// The diagnostic stream of this run.
    pub fn err(&mut self) -> &mut dyn Write {
        &mut *self.err
    }

    pub fn cli(&self) -> &'a Cli {
        self.cli
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    /// The receiving namespace's invocation string, e.g. `tmx file-metrics`.
    pub fn invocation(&self) -> &'a str {
        self.namespace.invocation()
    }

    pub fn palette(&self) -> &'a Palette {
        self.cli.palette()
    }

    /// Looks a service up in the receiving namespace, then outward to the root.
    pub fn service<T: Any>(&self) -> Option<&'a T> {
        self.lineage
            .iter()
            .rev()
            .find_map(|namespace| namespace.services().get::<T>())
    }

    pub fn require_service<T: Any>(&self) -> anyhow::Result<&'a T> {
        self.service::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "service missing: type {} not registered on '{}' or its parents",
                std::any::type_name::<T>(),
                self.invocation()
            )
        })
    }

    /// Renders the receiving namespace's help screen.
    pub fn help(&mut self) -> io::Result<()> {
        help::write_help(self.cli.palette(), self.namespace, &mut *self.out, &mut *self.err)
    }

    /// Writes `msg` (if any), the namespace usage line, and the invitation.
    pub fn usage(&mut self, msg: Option<&str>) -> io::Result<()> {
        help::write_usage(
            self.cli.palette(),
            &self.namespace.usage_string(),
            self.namespace.invocation(),
            msg,
            &mut *self.err,
        )
    }

    pub fn invite(&mut self) -> io::Result<()> {
        help::write_invite(self.cli.palette(), self.namespace.invocation(), &mut *self.err)
    }

    /// Writes the `<program> <version>` banner.
    pub fn version(&mut self) -> io::Result<()> {
        help::write_version(
            self.cli.palette(),
            self.cli.program_name(),
            self.cli.version().as_deref(),
            &mut *self.err,
        )
    }
}
