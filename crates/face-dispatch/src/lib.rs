//! Declarative command-tree dispatch for CLIs.
//!
//! `face-dispatch` resolves an argument vector against a tree of namespaces
//! and commands, parses the resolved command's own flags, and invokes its
//! handler. Commands are matched by exact name or by any unambiguous prefix,
//! so `tmx file-metrics line` runs `line-count`.
//!
//! # Features
//!
//! - **Tree definition**: fluent builders for commands, nested namespaces,
//!   namespace-level flags and per-namespace services
//! - **Abbreviation matching**: exact names win, unique prefixes resolve,
//!   shared prefixes are reported as ambiguous
//! - **Per-command options**: each command builds its option parser once, on
//!   first use, and seeds request defaults from it
//! - **Arity checks**: handlers declare how many positional arguments they
//!   take; a mismatch becomes a usage message on the command
//! - **Help and usage**: generated from the tree, with `-h` on every
//!   namespace and an optional `-v` on the root
//!
//! # Example
//!
//! ```rust
//! use std::io::Write;
//!
//! use face_dispatch::{Arity, Cli, ColorMode, CommandDef, RunResult};
//!
//! let cli = Cli::builder()
//!     .program_name("tmx")
//!     .version("0.1.0")
//!     .colors(ColorMode::Never)
//!     .namespace("file-metrics", |ns| {
//!         ns.command(
//!             CommandDef::new("line-count")
//!                 .options_with_request(|op, req| {
//!                     req.set("count_comment_lines", true);
//!                     op.on(["-C", "--no-comments", "don't count comments"], |req, _| {
//!                         req.set("count_comment_lines", false);
//!                     });
//!                 })
//!                 .handler(Arity::at_least(1), |scope, req| {
//!                     let comments = req.flag("count_comment_lines");
//!                     writeln!(scope.out(), "{:?} comments={comments}", req.args())?;
//!                     Ok(())
//!                 }),
//!         )
//!     })
//!     .build()?;
//!
//! let mut out = Vec::new();
//! let mut err = Vec::new();
//! let result = cli.run_with(["file-metrics", "line", "-C", "src/"], &mut out, &mut err)?;
//!
//! assert!(result.is_handled());
//! assert_eq!(String::from_utf8(out)?, "[\"src/\"] comments=false\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Streams
//!
//! Handler output and the rows of a command listing go to the output stream.
//! Usage lines, diagnostics and help headers go to the diagnostic stream.
//! [`Cli::run`] uses stdout and stderr; [`Cli::run_with`] takes any pair of
//! writers.

mod cli;
mod command;
mod error;
mod handler;
mod help;
mod namespace;
mod options;
mod request;
mod scope;
mod style;
pub mod tree;

pub use cli::{Cli, CliBuilder, Rejection, RunResult, Version};

pub use command::{routine_key, Command, CommandDef, CommandParser, FlagAction, OptionBuilder};

pub use error::{ArgumentCountError, BuildError, DispatchError, OptionError};

pub use handler::{Arity, Handler, HandlerResult, Services};

pub use namespace::{Namespace, NamespaceAction, NamespaceBuilder};

pub use options::{Fired, OptionParser, Switch};

pub use request::Request;

pub use scope::Scope;

pub use style::{ColorMode, Palette};

pub use tree::{Node, Resolution, Treeish};
