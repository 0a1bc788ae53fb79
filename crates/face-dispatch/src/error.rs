//! Error types for building and running a command tree.

use std::io;

use thiserror::Error;

use crate::handler::Arity;

/// A programming error in a tree definition, reported by `CliBuilder::build`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A command or namespace was declared with an empty name.
    #[error("empty command name in '{namespace}'")]
    EmptyName { namespace: String },

    /// Two children of one namespace share the exact same name.
    #[error("duplicate command '{name}' in '{namespace}'")]
    DuplicateName { namespace: String, name: String },

    /// A command has no inline handler and its namespace has no routine for it.
    #[error("command '{command}' has no handler and no routine named '{routine}'")]
    MissingRoutine { command: String, routine: String },
}

/// The parser could not make sense of the flags it was given.
///
/// `message` is the one-line form, e.g.
/// `error: unexpected argument '-x' found`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OptionError {
    message: String,
    kind: clap::error::ErrorKind,
}

impl OptionError {
    pub(crate) fn from_clap(err: clap::Error) -> Self {
        let rendered = err.to_string();
        let message = rendered
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("error: invalid option")
            .to_string();
        Self {
            message,
            kind: err.kind(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> clap::error::ErrorKind {
        self.kind
    }
}

/// A handler was given a number of positional arguments it does not accept.
///
/// Counts are positional counts only; the request is never included.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, serde::Serialize)]
#[error("wrong number of arguments ({given} for {expected})")]
pub struct ArgumentCountError {
    pub given: usize,
    pub expected: Arity,
}

/// Failures that escape [`Cli::run`](crate::Cli::run).
///
/// Everything a user can cause (unknown commands, bad flags, wrong argument
/// counts) is rendered and returned as a [`RunResult`](crate::RunResult)
/// instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Handler(anyhow::Error),
}
