//! Namespaces and the tree-definition builder.
//!
//! A [`NamespaceBuilder`] accumulates child commands, nested namespaces,
//! routines, shared flags and services. Nothing is kept once
//! [`CliBuilder::build`](crate::CliBuilder::build) has compiled it into an
//! immutable [`Namespace`].
//!
//! # Routines
//!
//! A command declared without an inline handler binds to a routine of its
//! namespace, looked up by [`routine_key`] of the command name unless
//! [`CommandDef::routine`] names one. Routines no command claims become
//! commands of their own, named by their key and listed after the declared
//! children:
//!
//! ```rust
//! use face_dispatch::{Arity, Cli, CommandDef};
//!
//! let cli = Cli::builder()
//!     .program_name("tmx")
//!     .namespace("file-metrics", |ns| {
//!         ns.command(CommandDef::new("line-count"))
//!             .routine("line_count", Arity::any(), |_, _| Ok(()))
//!             .routine("dir_count", Arity::any(), |_, _| Ok(()))
//!     })
//!     .build()?;
//!
//! let ns = cli.root().children()[0].as_namespace().unwrap();
//! let names: Vec<&str> = ns.children().iter().map(|c| c.name()).collect();
//! assert_eq!(names, ["line-count", "dir_count"]);
//! # Ok::<(), face_dispatch::BuildError>(())
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::command::{routine_key, Command, CommandDef};
use crate::error::BuildError;
use crate::handler::{Arity, Handler, HandlerResult, Services};
use crate::options::OptionParser;
use crate::request::Request;
use crate::scope::Scope;
use crate::style::Palette;
use crate::tree::{Node, Treeish};

/// Action fired when a namespace-level flag matches. Runs with the namespace
/// as receiver and gets the flag's value, if it takes one.
pub type NamespaceAction =
    Arc<dyn Fn(&mut Scope<'_>, Option<&str>) -> HandlerResult + Send + Sync>;

/// An internal node of the command tree.
pub struct Namespace {
    name: String,
    invocation: String,
    children: Vec<Node>,
    options: OptionParser<NamespaceAction>,
    services: Services,
    palette: Palette,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Space-joined names from the program down to this namespace.
    pub fn invocation(&self) -> &str {
        &self.invocation
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The namespace's own flags (`-h`, `-v`, and whatever the definition added).
    pub fn option_parser(&self) -> &OptionParser<NamespaceAction> {
        &self.options
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// `usage: <invocation> {a|b|c} [opts] [args]`
    pub fn usage_string(&self) -> String {
        usage_string(&self.palette, &self.invocation, &self.expecting())
    }

    /// How this namespace is listed in its parent's help.
    pub fn summary(&self) -> Vec<String> {
        let names: Vec<String> = self
            .children
            .iter()
            .map(|c| self.palette.hi(c.name()))
            .collect();
        let plural = if names.len() == 1 { "" } else { "s" };
        vec![format!("child command{plural}: {{{}}}", names.join("|"))]
    }
}

impl Treeish for Namespace {
    fn children(&self) -> &[Node] {
        &self.children
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("invocation", &self.invocation)
            .field("children", &self.children)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

fn usage_string(palette: &Palette, invocation: &str, expecting: &str) -> String {
    format!(
        "{} {invocation} {{{expecting}}} [opts] [args]",
        palette.hi("usage:")
    )
}

enum Entry {
    Command(CommandDef),
    Namespace(NamespaceBuilder),
}

/// Builder for one level of the command tree.
pub struct NamespaceBuilder {
    name: String,
    entries: Vec<Entry>,
    routines: Vec<(String, Handler)>,
    options: OptionParser<NamespaceAction>,
    services: Services,
}

impl NamespaceBuilder {
    /// Creates a builder with the built-in `-h, --help` already registered.
    pub fn new(name: impl Into<String>) -> Self {
        let builder = Self {
            name: name.into(),
            entries: Vec::new(),
            routines: Vec::new(),
            options: OptionParser::new(),
            services: Services::new(),
        };
        builder.on(["-h", "--help", "show this screen"], |scope, _| {
            scope.help()?;
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Adds a leaf command.
    pub fn command(mut self, def: CommandDef) -> Self {
        self.entries.push(Entry::Command(def));
        self
    }

    /// Adds a nested namespace, configured by `configure`.
    pub fn namespace<F>(mut self, name: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(NamespaceBuilder) -> NamespaceBuilder,
    {
        let nested = configure(NamespaceBuilder::new(name));
        self.entries.push(Entry::Namespace(nested));
        self
    }

    /// Registers a routine under `key`. Re-registering a key replaces it.
    pub fn routine<F>(mut self, key: impl Into<String>, arity: Arity, f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Request) -> HandlerResult + Send + Sync + 'static,
    {
        let key = key.into();
        let handler = Handler::new(arity, f);
        match self.routines.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = handler,
            None => self.routines.push((key, handler)),
        }
        self
    }

    /// Adds a namespace-level flag. A flag reusing `-h` or `--help` replaces
    /// the built-in help.
    pub fn on<I, S, F>(mut self, parts: I, action: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&mut Scope<'_>, Option<&str>) -> HandlerResult + Send + Sync + 'static,
    {
        self.options.on(parts, Arc::new(action));
        self
    }

    /// Removes every namespace-level flag answering to `flag`, e.g. `"-h"`.
    pub fn remove_option(mut self, flag: &str) -> Self {
        self.options.remove(flag);
        self
    }

    /// Stores a value handlers of this namespace (and its descendants) can
    /// reach through [`Scope::service`].
    pub fn service<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.services.insert(value);
        self
    }

    pub(crate) fn has_option(&self, flag: &str) -> bool {
        self.options.has(flag)
    }

    /// Compiles this level and everything below it.
    pub(crate) fn build(self, invocation: String, palette: &Palette) -> Result<Namespace, BuildError> {
        let mut children = Vec::with_capacity(self.entries.len() + self.routines.len());
        let mut claimed: HashSet<String> = HashSet::new();
        let mut names: HashSet<String> = HashSet::new();

        for entry in self.entries {
            let child = match entry {
                Entry::Command(def) => {
                    check_name(&def.name, &invocation, &mut names)?;
                    let child_invocation = format!("{invocation} {}", def.name);
                    let handler = match def.handler {
                        Some(handler) => handler,
                        None => {
                            let key = def.routine.unwrap_or_else(|| routine_key(&def.name));
                            let handler = self
                                .routines
                                .iter()
                                .find(|(k, _)| *k == key)
                                .map(|(_, h)| h.clone())
                                .ok_or_else(|| BuildError::MissingRoutine {
                                    command: child_invocation.clone(),
                                    routine: key.clone(),
                                })?;
                            claimed.insert(key);
                            handler
                        }
                    };
                    Node::Command(Command::new(
                        def.name,
                        child_invocation,
                        def.builder,
                        handler,
                        palette.clone(),
                    ))
                }
                Entry::Namespace(nested) => {
                    check_name(&nested.name, &invocation, &mut names)?;
                    let child_invocation = format!("{invocation} {}", nested.name);
                    Node::Namespace(nested.build(child_invocation, palette)?)
                }
            };
            children.push(child);
        }

        for (key, handler) in self.routines {
            if claimed.contains(&key) {
                continue;
            }
            check_name(&key, &invocation, &mut names)?;
            tracing::trace!(namespace = %invocation, routine = %key, "implicit command");
            let child_invocation = format!("{invocation} {key}");
            children.push(Node::Command(Command::new(
                key,
                child_invocation,
                None,
                handler,
                palette.clone(),
            )));
        }

        let mut options = self.options;
        let expecting: Vec<&str> = children.iter().map(Node::name).collect();
        let mut banner = usage_string(palette, &invocation, &expecting.join("|"));
        if !options.is_empty() {
            let shorts: Vec<String> = options
                .switches()
                .iter()
                .map(|s| match (s.short(), s.long()) {
                    (Some(c), _) => format!("-{c}"),
                    (None, Some(long)) => format!("--{long}"),
                    (None, None) => String::new(),
                })
                .collect();
            banner.push_str(&format!("\n       {invocation} {{{}}}", shorts.join("|")));
            banner.push('\n');
            banner.push_str(&palette.hi("options:"));
        }
        options.set_banner(banner);

        Ok(Namespace {
            name: self.name,
            invocation,
            children,
            options,
            services: self.services,
            palette: palette.clone(),
        })
    }
}

fn check_name(name: &str, namespace: &str, seen: &mut HashSet<String>) -> Result<(), BuildError> {
    if name.is_empty() {
        return Err(BuildError::EmptyName {
            namespace: namespace.to_string(),
        });
    }
    if !seen.insert(name.to_string()) {
        return Err(BuildError::DuplicateName {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for NamespaceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routines: Vec<&str> = self.routines.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("NamespaceBuilder")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("routines", &routines)
            .finish_non_exhaustive()
    }
}
