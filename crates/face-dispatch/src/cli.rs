//! The root of the tree and the dispatch loop.
//!
//! [`Cli::run_with`] peels one token of the argument vector per level:
//!
//! - a token starting with `-` hands the rest of the vector to the current
//!   namespace's own flags (`-h`, `-v`, ...), whatever they leave over is
//!   reported as ignored;
//! - otherwise the token is resolved against the current namespace's
//!   children (see [`tree`](crate::tree)); a namespace is descended into, a
//!   command ends the loop.
//!
//! The resolved command parses its own flags into a [`Request`], the
//! positional count is checked against the handler's [`Arity`], and the
//! handler runs with a [`Scope`] on the namespace that owns the command.
//!
//! Everything the user can get wrong is rendered on the diagnostic stream and
//! returned as [`RunResult::Rejected`]; only stream failures and handler
//! errors come back as `Err`.
//!
//! [`Request`]: crate::Request
//! [`Arity`]: crate::Arity

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::command::{Command, CommandDef};
use crate::error::{ArgumentCountError, BuildError, DispatchError};
use crate::handler::{Arity, HandlerResult};
use crate::help;
use crate::namespace::{Namespace, NamespaceBuilder};
use crate::request::Request;
use crate::scope::Scope;
use crate::style::{ColorMode, Palette};
use crate::tree::{Node, Resolution, Treeish};

/// Version metadata shown by `-v, --version`.
#[derive(Clone)]
pub enum Version {
    Text(String),
    /// Parts joined with single spaces, e.g. `["1.2.0", "(beta)"]`.
    Parts(Vec<String>),
    /// Computed each time the banner is shown.
    Callback(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Version {
    pub fn parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Version::Parts(parts.into_iter().map(Into::into).collect())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Version::Callback(Arc::new(f))
    }

    pub fn render(&self) -> String {
        match self {
            Version::Text(text) => text.clone(),
            Version::Parts(parts) => parts.join(" "),
            Version::Callback(f) => f(),
        }
    }
}

impl From<&str> for Version {
    fn from(text: &str) -> Self {
        Version::Text(text.to_string())
    }
}

impl From<String> for Version {
    fn from(text: String) -> Self {
        Version::Text(text)
    }
}

impl From<Vec<String>> for Version {
    fn from(parts: Vec<String>) -> Self {
        Version::Parts(parts)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Version::Parts(parts) => f.debug_tuple("Parts").field(parts).finish(),
            Version::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Why a run ended without calling a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing was left to resolve at `namespace`.
    Empty { namespace: String },
    Unrecognized { given: String },
    Ambiguous { given: String, candidates: Vec<String> },
    /// The option parser refused the flags; `message` is its one-line error.
    InvalidOption { message: String },
    ArgumentCount(ArgumentCountError),
}

/// The outcome of one [`Cli::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    /// A handler ran to completion; the path holds the names resolved to
    /// reach it, program name excluded.
    Handled(Vec<String>),
    /// A namespace's own flags (or a command's `-h`) consumed the run.
    Options,
    Rejected(Rejection),
}

impl RunResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, RunResult::Handled(_))
    }

    /// `0` for handled runs and option runs, `2` for rejections.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Handled(_) | RunResult::Options => 0,
            RunResult::Rejected(_) => 2,
        }
    }
}

/// Builder for a [`Cli`].
///
/// The tree methods mirror [`NamespaceBuilder`]'s and apply to the root.
pub struct CliBuilder {
    program_name: Option<String>,
    version: Option<Version>,
    colors: ColorMode,
    root: NamespaceBuilder,
}

impl Default for CliBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CliBuilder {
    pub fn new() -> Self {
        Self {
            program_name: None,
            version: None,
            colors: ColorMode::default(),
            root: NamespaceBuilder::new(""),
        }
    }

    /// The name used in usage lines. Defaults to the basename of `argv[0]`.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    /// Sets the version and registers `-v, --version` on the root, unless a
    /// `-v` flag is already defined there.
    pub fn version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        if !self.root.has_option("-v") {
            self.root = self.root.on(["-v", "--version", "shows version"], |scope, _| {
                scope.version()?;
                Ok(())
            });
        }
        self
    }

    pub fn colors(mut self, mode: ColorMode) -> Self {
        self.colors = mode;
        self
    }

    pub fn command(mut self, def: CommandDef) -> Self {
        self.root = self.root.command(def);
        self
    }

    pub fn namespace<F>(mut self, name: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(NamespaceBuilder) -> NamespaceBuilder,
    {
        self.root = self.root.namespace(name, configure);
        self
    }

    pub fn routine<F>(mut self, key: impl Into<String>, arity: Arity, f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.root = self.root.routine(key, arity, f);
        self
    }

    pub fn on<I, S, F>(mut self, parts: I, action: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&mut Scope<'_>, Option<&str>) -> HandlerResult + Send + Sync + 'static,
    {
        self.root = self.root.on(parts, action);
        self
    }

    pub fn remove_option(mut self, flag: &str) -> Self {
        self.root = self.root.remove_option(flag);
        self
    }

    pub fn service<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.root = self.root.service(value);
        self
    }

    /// Compiles the tree.
    pub fn build(self) -> Result<Cli, BuildError> {
        let program_name = self.program_name.unwrap_or_else(default_program_name);
        let palette = Palette::new(self.colors);
        let mut root = self.root;
        root.set_name(program_name.clone());
        let root = root.build(program_name.clone(), &palette)?;
        tracing::debug!(program = %program_name, children = root.children().len(), "built command tree");
        Ok(Cli {
            program_name,
            version: self.version,
            palette,
            root,
        })
    }
}

impl fmt::Debug for CliBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliBuilder")
            .field("program_name", &self.program_name)
            .field("version", &self.version)
            .field("colors", &self.colors)
            .field("root", &self.root)
            .finish()
    }
}

fn default_program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cli".to_string())
}

/// A built command tree, ready to run.
///
/// Immutable once built; share it behind an `Arc` to serve runs from several
/// threads.
pub struct Cli {
    program_name: String,
    version: Option<Version>,
    palette: Palette,
    root: Namespace,
}

impl Cli {
    pub fn builder() -> CliBuilder {
        CliBuilder::new()
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    /// The rendered version, if one was configured.
    pub fn version(&self) -> Option<String> {
        self.version.as_ref().map(Version::render)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The root namespace; its invocation is the program name.
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Runs `argv` (without the program name) against stdout and stderr.
    pub fn run<I, T>(&self, argv: I) -> Result<RunResult, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let stdout = io::stdout();
        let stderr = io::stderr();
        let mut out = stdout.lock();
        let mut err = stderr.lock();
        self.run_with(argv, &mut out, &mut err)
    }

    /// Runs `argv` (without the program name) against the given streams.
    pub fn run_with<I, T>(
        &self,
        argv: I,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<RunResult, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut lineage: Vec<&Namespace> = vec![&self.root];
        let mut current: &Namespace = &self.root;

        loop {
            if argv.first().is_some_and(|arg| arg.starts_with('-')) {
                return self.run_opts(lineage, argv, out, err);
            }

            let (node, rest) = match current.resolve(&argv) {
                Resolution::Resolved { node, remaining } => (node, remaining.to_vec()),
                Resolution::Empty => {
                    tracing::debug!(namespace = %current.invocation(), "empty argv");
                    self.write_usage(current, None, err)?;
                    return Ok(RunResult::Rejected(Rejection::Empty {
                        namespace: current.invocation().to_string(),
                    }));
                }
                Resolution::Unrecognized { given } => {
                    tracing::debug!(given = %given, namespace = %current.invocation(), "unrecognized command");
                    let msg = help::unrecognized_message(&self.palette, given, &current.expecting());
                    self.write_usage(current, Some(&msg), err)?;
                    return Ok(RunResult::Rejected(Rejection::Unrecognized {
                        given: given.to_string(),
                    }));
                }
                Resolution::Ambiguous { given, candidates } => {
                    let names: Vec<String> = candidates.iter().map(|c| c.name().to_string()).collect();
                    tracing::debug!(given = %given, candidates = ?names, "ambiguous command");
                    let msg = help::ambiguous_message(&self.palette, given, &candidates);
                    self.write_usage(current, Some(&msg), err)?;
                    return Ok(RunResult::Rejected(Rejection::Ambiguous {
                        given: given.to_string(),
                        candidates: names,
                    }));
                }
            };
            argv = rest;
            tracing::trace!(resolved = %node.invocation(), "resolved");

            match node {
                Node::Namespace(namespace) => {
                    lineage.push(namespace);
                    current = namespace;
                }
                Node::Command(command) => return self.dispatch(lineage, command, argv, out, err),
            }
        }
    }

    fn write_usage(&self, namespace: &Namespace, msg: Option<&str>, err: &mut dyn Write) -> io::Result<()> {
        help::write_usage(
            &self.palette,
            &namespace.usage_string(),
            namespace.invocation(),
            msg,
            err,
        )
    }

    /// Lets the current namespace's own flags consume the rest of `argv`.
    fn run_opts(
        &self,
        lineage: Vec<&Namespace>,
        mut argv: Vec<String>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<RunResult, DispatchError> {
        let Some(&namespace) = lineage.last() else {
            return Ok(RunResult::Options);
        };

        let fired = match namespace.option_parser().parse(&mut argv) {
            Ok(fired) => fired,
            Err(e) => {
                tracing::debug!(namespace = %namespace.invocation(), error = %e, "invalid namespace option");
                writeln!(err, "{}", self.palette.highlight_header(e.message()))?;
                help::write_invite(&self.palette, namespace.invocation(), err)?;
                return Ok(RunResult::Rejected(Rejection::InvalidOption {
                    message: e.message().to_string(),
                }));
            }
        };

        {
            let mut scope = Scope::new(self, lineage.clone(), &mut *out, &mut *err);
            for f in fired {
                (f.action)(&mut scope, f.value.as_deref()).map_err(DispatchError::Handler)?;
            }
        }

        if !argv.is_empty() {
            writeln!(err, "{}", help::ignoring_message(&self.palette, &argv))?;
        }
        Ok(RunResult::Options)
    }

    fn dispatch(
        &self,
        lineage: Vec<&Namespace>,
        command: &Command,
        mut argv: Vec<String>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<RunResult, DispatchError> {
        let request = match command.parse_or_help(&mut argv) {
            Ok(Some(request)) => request,
            Ok(None) => {
                write!(err, "{}", command.option_parser().render())?;
                return Ok(RunResult::Options);
            }
            Err(e) => {
                tracing::debug!(command = %command.invocation(), error = %e, "invalid command option");
                writeln!(err, "{}", self.palette.highlight_header(e.message()))?;
                help::write_invite(&self.palette, command.invocation(), err)?;
                return Ok(RunResult::Rejected(Rejection::InvalidOption {
                    message: e.message().to_string(),
                }));
            }
        };

        let path: Vec<String> = lineage
            .iter()
            .skip(1)
            .map(|ns| ns.name().to_string())
            .chain(std::iter::once(command.name().to_string()))
            .collect();

        tracing::debug!(command = %command.invocation(), args = request.args().len(), "dispatching");
        let outcome = {
            let mut scope = Scope::new(self, lineage, &mut *out, &mut *err);
            command.handler().invoke(&mut scope, request)
        };

        let mismatch = match outcome {
            Ok(Ok(())) => return Ok(RunResult::Handled(path)),
            Ok(Err(e)) => match e.downcast::<ArgumentCountError>() {
                Ok(mismatch) => mismatch,
                Err(e) => return Err(DispatchError::Handler(e)),
            },
            Err(mismatch) => mismatch,
        };

        tracing::debug!(command = %command.invocation(), given = mismatch.given, expected = %mismatch.expected, "wrong number of arguments");
        help::write_usage(
            &self.palette,
            &command.usage_string(),
            command.invocation(),
            Some(&mismatch.to_string()),
            err,
        )?;
        Ok(RunResult::Rejected(Rejection::ArgumentCount(mismatch)))
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("program_name", &self.program_name)
            .field("version", &self.version)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cli: &Cli, argv: &[&str]) -> (RunResult, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = cli.run_with(argv.iter().copied(), &mut out, &mut err).unwrap();
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn app() -> CliBuilder {
        Cli::builder().program_name("app").colors(ColorMode::Never)
    }

    #[test]
    fn test_version_forms() {
        assert_eq!(Version::from("1.0").render(), "1.0");
        assert_eq!(Version::parts(["1.0", "(beta)"]).render(), "1.0 (beta)");
        assert_eq!(Version::callback(|| "dyn".to_string()).render(), "dyn");
    }

    #[test]
    fn test_version_registers_flag() {
        let cli = app().version("1.2.0").build().unwrap();
        assert!(cli.root().option_parser().has("-v"));
        assert!(cli.root().option_parser().has("--version"));

        let (result, out, err) = run(&cli, &["-v"]);
        assert_eq!(result, RunResult::Options);
        assert!(out.is_empty());
        assert_eq!(err, "app 1.2.0\n");
    }

    #[test]
    fn test_version_keeps_existing_v_flag() {
        let cli = app()
            .on(["-v", "--verbose", "talk more"], |_, _| Ok(()))
            .version("1.0")
            .build()
            .unwrap();
        let switches = cli.root().option_parser().switches();
        assert!(switches.iter().all(|s| s.long() != Some("version")));
    }

    #[test]
    fn test_no_version_means_no_v_flag() {
        let cli = app().build().unwrap();
        assert!(!cli.root().option_parser().has("-v"));
        assert_eq!(cli.version(), None);
    }

    #[test]
    fn test_handled_path() {
        let cli = app()
            .namespace("db", |ns| {
                ns.command(CommandDef::new("migrate").handler(Arity::none(), |_, _| Ok(())))
            })
            .build()
            .unwrap();
        let (result, _, _) = run(&cli, &["db", "mig"]);
        assert_eq!(result, RunResult::Handled(vec!["db".into(), "migrate".into()]));
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_handler_error_propagates() {
        let cli = app()
            .command(CommandDef::new("fail").handler(Arity::any(), |_, _| anyhow::bail!("boom")))
            .build()
            .unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = cli.run_with(["fail"], &mut out, &mut err);
        match result {
            Err(DispatchError::Handler(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected handler error, got {other:?}"),
        }
    }

    #[test]
    fn test_handler_raised_argument_count_renders_usage() {
        let cli = app()
            .command(CommandDef::new("pick").handler(Arity::any(), |_, req| {
                if req.args().len() != 2 {
                    return Err(ArgumentCountError {
                        given: req.args().len(),
                        expected: Arity::exactly(2),
                    }
                    .into());
                }
                Ok(())
            }))
            .build()
            .unwrap();

        let (result, _, err) = run(&cli, &["pick", "a"]);
        assert_eq!(result.exit_code(), 2);
        assert_eq!(
            err,
            "wrong number of arguments (1 for 2)\nusage: app pick [opts] [args]\nTry app pick -h for help.\n"
        );
    }

    #[test]
    fn test_rejection_serializes() {
        let result = RunResult::Rejected(Rejection::Unrecognized { given: "x".into() });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rejected"]["unrecognized"]["given"], "x");
    }

    #[test]
    fn test_cli_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Cli>();
    }
}
