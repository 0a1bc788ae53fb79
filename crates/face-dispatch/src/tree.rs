//! Tree nodes and command resolution.
//!
//! Resolution consumes one token of the argument vector per level. Given a
//! node's children in declaration order and the first remaining token:
//!
//! 1. A child whose name is exactly the token wins, regardless of where it
//!    appears among the children or how many other names it prefixes.
//! 2. Otherwise every child whose name starts with the token is a candidate.
//! 3. No candidate is [`Resolution::Unrecognized`], one is
//!    [`Resolution::Resolved`], several are [`Resolution::Ambiguous`] (listed
//!    in declaration order).
//!
//! An empty argument vector is [`Resolution::Empty`].

use std::fmt;

use crate::command::Command;
use crate::namespace::Namespace;

/// A child in the command tree.
pub enum Node {
    Command(Command),
    Namespace(Namespace),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Command(c) => c.name(),
            Node::Namespace(n) => n.name(),
        }
    }

    pub fn invocation(&self) -> &str {
        match self {
            Node::Command(c) => c.invocation(),
            Node::Namespace(n) => n.invocation(),
        }
    }

    /// One-line help fragments shown next to the name in a command listing.
    pub fn summary(&self) -> Vec<String> {
        match self {
            Node::Command(c) => c.summary(),
            Node::Namespace(n) => n.summary(),
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Node::Command(c) => Some(c),
            Node::Namespace(_) => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Node::Namespace(n) => Some(n),
            Node::Command(_) => None,
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self, Node::Namespace(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Command(c) => fmt::Debug::fmt(c, f),
            Node::Namespace(n) => fmt::Debug::fmt(n, f),
        }
    }
}

/// The outcome of matching one token against a node's children.
#[derive(Debug)]
pub enum Resolution<'t, 'a> {
    /// Exactly one child matched; `remaining` is the argv after its token.
    Resolved {
        node: &'t Node,
        remaining: &'a [String],
    },
    Ambiguous {
        given: &'a str,
        candidates: Vec<&'t Node>,
    },
    Unrecognized {
        given: &'a str,
    },
    Empty,
}

/// Resolves the first token of `argv` against `children`.
pub fn resolve<'t, 'a>(children: &'t [Node], argv: &'a [String]) -> Resolution<'t, 'a> {
    let Some(given) = argv.first() else {
        return Resolution::Empty;
    };
    let remaining = &argv[1..];

    if let Some(node) = children.iter().find(|c| c.name() == given) {
        tracing::trace!(given = %given, "exact match");
        return Resolution::Resolved { node, remaining };
    }

    let found: Vec<&Node> = children
        .iter()
        .filter(|c| c.name().starts_with(given.as_str()))
        .collect();

    match found.len() {
        0 => Resolution::Unrecognized { given },
        1 => Resolution::Resolved {
            node: found[0],
            remaining,
        },
        _ => Resolution::Ambiguous {
            given,
            candidates: found,
        },
    }
}

/// Shared behavior of everything that owns children: the root and every
/// namespace.
pub trait Treeish {
    fn children(&self) -> &[Node];

    fn resolve<'t, 'a>(&'t self, argv: &'a [String]) -> Resolution<'t, 'a> {
        resolve(self.children(), argv)
    }

    /// The child names joined with `|`, as shown in usage lines.
    fn expecting(&self) -> String {
        self.children()
            .iter()
            .map(Node::name)
            .collect::<Vec<_>>()
            .join("|")
    }
}
