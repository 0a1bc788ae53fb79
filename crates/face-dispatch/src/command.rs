//! Leaf commands.
//!
//! A [`CommandDef`] is what a tree definition declares: a name, an optional
//! option builder, and a handler (inline, or a routine of the owning
//! namespace). [`CliBuilder::build`](crate::CliBuilder::build) compiles each
//! one into an immutable [`Command`].
//!
//! A command's option parser is built the first time it is needed and kept
//! for the life of the tree. Defaults the builder writes into the request are
//! kept alongside it and copied into every new [`Request`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::OptionError;
use crate::handler::{Arity, Handler, HandlerResult};
use crate::options::{Fired, OptionParser};
use crate::request::Request;
use crate::scope::Scope;
use crate::style::Palette;

/// Action fired when a command flag matches: receives the request being
/// assembled and the flag's value, if it takes one.
pub type FlagAction = Arc<dyn Fn(&mut Request, Option<&str>) + Send + Sync>;

/// How a command defines its options.
///
/// The variant states what the builder expects to receive; nothing is
/// inferred from the closure itself.
#[derive(Clone)]
pub enum OptionBuilder {
    ParserOnly(Arc<dyn Fn(&mut CommandParser) + Send + Sync>),
    ParserAndRequest(Arc<dyn Fn(&mut CommandParser, &mut Request) + Send + Sync>),
}

impl OptionBuilder {
    fn apply(&self, parser: &mut CommandParser, request: &mut Request) {
        match self {
            OptionBuilder::ParserOnly(f) => f(parser),
            OptionBuilder::ParserAndRequest(f) => f(parser, request),
        }
    }
}

/// The option parser of one command, as seen by its option builder.
pub struct CommandParser {
    options: OptionParser<FlagAction>,
    invocation: String,
    syntax: Option<String>,
    palette: Palette,
}

impl CommandParser {
    fn new(invocation: &str, palette: &Palette) -> Self {
        Self {
            options: OptionParser::new(),
            invocation: invocation.to_string(),
            syntax: None,
            palette: palette.clone(),
        }
    }

    /// Registers a flag; see [`OptionParser::on`] for the shape of `parts`.
    pub fn on<I, S, F>(&mut self, parts: I, action: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&mut Request, Option<&str>) + Send + Sync + 'static,
    {
        self.options.on(parts, Arc::new(action));
        self
    }

    pub fn banner(&self) -> Option<&str> {
        self.options.banner()
    }

    pub fn set_banner(&mut self, banner: impl Into<String>) {
        self.options.set_banner(banner);
    }

    /// The command's invocation string, e.g. `tmx file-metrics line-count`.
    pub fn invocation(&self) -> &str {
        &self.invocation
    }

    /// The argument synopsis shown after `usage:`.
    pub fn syntax(&self) -> String {
        self.syntax
            .clone()
            .unwrap_or_else(|| format!("{} [opts] [args]", self.invocation))
    }

    pub fn set_syntax(&mut self, syntax: impl Into<String>) {
        self.syntax = Some(syntax.into());
    }

    pub fn usage_string(&self) -> String {
        format!("{} {}", self.palette.hi("usage:"), self.syntax())
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn options(&self) -> &OptionParser<FlagAction> {
        &self.options
    }

    /// The full help text: banner, then one block per flag.
    pub fn render(&self) -> String {
        self.options.render()
    }
}

/// Declaration of a command, consumed when the tree is built.
pub struct CommandDef {
    pub(crate) name: String,
    pub(crate) builder: Option<OptionBuilder>,
    pub(crate) handler: Option<Handler>,
    pub(crate) routine: Option<String>,
}

impl CommandDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builder: None,
            handler: None,
            routine: None,
        }
    }

    /// Defines options with a builder that only needs the parser.
    pub fn options<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CommandParser) + Send + Sync + 'static,
    {
        self.builder = Some(OptionBuilder::ParserOnly(Arc::new(f)));
        self
    }

    /// Defines options with a builder that also seeds request defaults.
    ///
    /// ```rust
    /// use face_dispatch::CommandDef;
    ///
    /// let def = CommandDef::new("line-count").options_with_request(|op, req| {
    ///     req.set("count_blank_lines", true);
    ///     op.on(["-B", "--no-blank-lines", "don't count blank lines"], |req, _| {
    ///         req.set("count_blank_lines", false);
    ///     });
    /// });
    /// # let _ = def;
    /// ```
    pub fn options_with_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CommandParser, &mut Request) + Send + Sync + 'static,
    {
        self.builder = Some(OptionBuilder::ParserAndRequest(Arc::new(f)));
        self
    }

    /// Binds an inline handler accepting `arity` positional arguments.
    pub fn handler<F>(mut self, arity: Arity, f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Handler::new(arity, f));
        self.routine = None;
        self
    }

    /// Binds to a routine of the owning namespace by key.
    ///
    /// Without this or [`handler`](Self::handler), the command binds to the
    /// routine named by [`routine_key`] of its name.
    pub fn routine(mut self, key: impl Into<String>) -> Self {
        self.routine = Some(key.into());
        self.handler = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CommandDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("name", &self.name)
            .field("routine", &self.routine)
            .finish_non_exhaustive()
    }
}

/// The routine key for a command name: lower-cased, with every run of
/// non-alphanumeric characters collapsed to `_` (`line-count` → `line_count`).
pub fn routine_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut gap = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if gap {
                key.push('_');
                gap = false;
            }
            key.push(c);
        } else {
            gap = true;
        }
    }
    if gap {
        key.push('_');
    }
    key
}

struct Built {
    parser: CommandParser,
    defaults: Request,
}

/// A leaf of the command tree.
pub struct Command {
    name: String,
    invocation: String,
    builder: Option<OptionBuilder>,
    handler: Handler,
    palette: Palette,
    built: OnceLock<Built>,
}

impl Command {
    pub(crate) fn new(
        name: String,
        invocation: String,
        builder: Option<OptionBuilder>,
        handler: Handler,
        palette: Palette,
    ) -> Self {
        Self {
            name,
            invocation,
            builder,
            handler,
            palette,
            built: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invocation(&self) -> &str {
        &self.invocation
    }

    pub fn routine_key(&self) -> String {
        routine_key(&self.name)
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The command's option parser, built on first use.
    pub fn option_parser(&self) -> &CommandParser {
        &self.built().parser
    }

    /// The request defaults seeded by the option builder.
    pub fn defaults(&self) -> &Request {
        &self.built().defaults
    }

    /// Parses `argv` in place into a fresh request.
    ///
    /// Recognized flags are removed from `argv` and their actions run, in
    /// order, against a copy of the defaults. What is left of `argv` becomes
    /// the request's positional arguments.
    pub fn parse(&self, argv: &mut Vec<String>) -> Result<Request, OptionError> {
        let built = self.built();
        let fired = built.parser.options.parse(argv)?;
        Ok(self.assemble(built, fired, argv))
    }

    /// Like [`parse`](Self::parse), but `-h`/`--help` ask for the command's
    /// help unless the option builder claimed those spellings. Returns
    /// `Ok(None)` for a help request.
    pub fn parse_or_help(&self, argv: &mut Vec<String>) -> Result<Option<Request>, OptionError> {
        let built = self.built();
        let Some(fired) = built.parser.options.parse_or_help(argv)? else {
            tracing::debug!(command = %self.invocation, "help requested");
            return Ok(None);
        };
        Ok(Some(self.assemble(built, fired, argv)))
    }

    /// Help fragments for command listings: the rendered parser without its
    /// leading `usage: `, one entry per non-blank line.
    pub fn summary(&self) -> Vec<String> {
        let text = self.option_parser().render();
        let prefix = format!("{} ", self.palette.hi("usage:"));
        text.strip_prefix(prefix.as_str())
            .unwrap_or(&text)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect()
    }

    pub fn syntax(&self) -> String {
        self.option_parser().syntax()
    }

    pub fn usage_string(&self) -> String {
        self.option_parser().usage_string()
    }

    fn assemble(&self, built: &Built, fired: Vec<Fired<'_, FlagAction>>, argv: &[String]) -> Request {
        let mut request = built.defaults.clone();
        for fired in fired {
            (fired.action)(&mut request, fired.value.as_deref());
        }
        request.set_args(argv.to_vec());
        tracing::debug!(command = %self.invocation, request = ?request, "parsed request");
        request
    }

    fn built(&self) -> &Built {
        self.built.get_or_init(|| self.build_option_parser())
    }

    fn build_option_parser(&self) -> Built {
        let mut parser = CommandParser::new(&self.invocation, &self.palette);
        let mut defaults = Request::new();
        if let Some(builder) = &self.builder {
            builder.apply(&mut parser, &mut defaults);
        }
        if parser.banner().is_none() {
            let usage = parser.usage_string();
            parser.set_banner(usage);
        }
        tracing::trace!(command = %self.invocation, "built option parser");
        Built { parser, defaults }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("invocation", &self.invocation)
            .field("arity", &self.handler.arity())
            .finish_non_exhaustive()
    }
}
