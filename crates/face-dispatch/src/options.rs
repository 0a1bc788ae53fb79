//! The option-parser capability.
//!
//! An [`OptionParser`] is a banner plus an ordered list of [`Switch`]es. Each
//! switch carries an action payload `A` that the parser never calls itself:
//! [`OptionParser::parse`] strips the recognized flags out of the argument
//! vector and hands back the fired actions, in command-line order, for the
//! caller to run against whatever context it owns (a [`Request`] for
//! commands, a [`Scope`] for namespaces).
//!
//! The flag grammar itself (bundled shorts, `--long=value`, `--`, abbreviated
//! long flags) is clap's. Every call to `parse` assembles a throwaway
//! `clap::Command` from the registered switches and collects whatever clap
//! could not attribute to a switch as positional arguments.
//!
//! [`Request`]: crate::Request
//! [`Scope`]: crate::Scope

use clap::{Arg, ArgAction};

use crate::error::OptionError;

const SUMMARY_INDENT: &str = "    ";
const SUMMARY_WIDTH: usize = 32;
const POSITIONAL_ID: &str = "__positional";
const HELP_ID: &str = "__help";

/// A single flag definition: its short and long spellings, an optional value
/// placeholder, description lines, and the action payload fired on a match.
pub struct Switch<A> {
    short: Option<char>,
    long: Option<String>,
    value_name: Option<String>,
    description: Vec<String>,
    action: A,
}

impl<A> Switch<A> {
    /// Builds a switch from option-parser style parts.
    ///
    /// Parts beginning with `-` are flag specs (`-x`, `-x VALUE`, `--long`,
    /// `--long VALUE`, `--long=VALUE`); every other part is a description line.
    fn from_parts<I, S>(parts: I, action: A) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut switch = Switch {
            short: None,
            long: None,
            value_name: None,
            description: Vec::new(),
            action,
        };

        for part in parts {
            let part = part.as_ref();
            if let Some(body) = part.strip_prefix("--").filter(|b| !b.is_empty()) {
                let (name, value) = split_spec(body);
                if name.is_empty() || name.starts_with('-') {
                    panic!("malformed long flag spec {part:?}");
                }
                switch.long = Some(name.to_string());
                if let Some(value) = value {
                    switch.value_name = Some(value.to_string());
                }
            } else if let Some(body) = part.strip_prefix('-').filter(|b| !b.is_empty()) {
                let mut chars = body.chars();
                switch.short = chars.next();
                if matches!(switch.short, Some(c) if c == '-' || c == '=' || c.is_whitespace()) {
                    panic!("malformed short flag spec {part:?}");
                }
                let rest = chars.as_str().trim_start_matches([' ', '=']).trim();
                if !rest.is_empty() {
                    switch.value_name = Some(rest.to_string());
                }
            } else {
                switch.description.push(part.to_string());
            }
        }

        switch
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn value_name(&self) -> Option<&str> {
        self.value_name.as_deref()
    }

    pub fn description(&self) -> &[String] {
        &self.description
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Returns true if the switch expects a value after the flag.
    pub fn takes_value(&self) -> bool {
        self.value_name.is_some()
    }

    /// Returns true if `flag` (`-h` or `--help` form) names this switch.
    pub fn matches(&self, flag: &str) -> bool {
        if let Some(long) = flag.strip_prefix("--") {
            self.long.as_deref() == Some(long)
        } else if let Some(short) = flag.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.short == Some(c),
                _ => false,
            }
        } else {
            false
        }
    }

    /// The display form of the flag spellings, e.g. `-D, --exclude-dir DIR`.
    pub fn synopsis(&self) -> String {
        let mut left = self
            .short
            .map(|c| format!("-{c}"))
            .unwrap_or_default();
        if let Some(long) = &self.long {
            left.push_str(if left.is_empty() { SUMMARY_INDENT } else { ", " });
            left.push_str("--");
            left.push_str(long);
        }
        if let Some(value) = &self.value_name {
            left.push(' ');
            left.push_str(value);
        }
        left
    }

    fn summarize(&self, text: &mut String) {
        let left = self.synopsis();
        let mut lines = self.description.iter();

        if left.len() <= SUMMARY_WIDTH {
            match lines.next() {
                Some(first) => push_line(
                    text,
                    &format!("{SUMMARY_INDENT}{left:<SUMMARY_WIDTH$} {first}"),
                ),
                None => push_line(text, &format!("{SUMMARY_INDENT}{left}")),
            }
        } else {
            push_line(text, &format!("{SUMMARY_INDENT}{left}"));
        }

        for line in lines {
            push_line(
                text,
                &format!("{SUMMARY_INDENT}{:SUMMARY_WIDTH$} {line}", ""),
            );
        }
    }

    fn has_flag(&self) -> bool {
        self.short.is_some() || self.long.is_some()
    }
}

/// A switch matched on the command line, with the value it consumed.
pub struct Fired<'p, A> {
    pub action: &'p A,
    pub value: Option<String>,
}

/// Banner plus ordered switches; see the module docs.
pub struct OptionParser<A> {
    banner: Option<String>,
    switches: Vec<Switch<A>>,
}

impl<A> Default for OptionParser<A> {
    fn default() -> Self {
        Self {
            banner: None,
            switches: Vec::new(),
        }
    }
}

impl<A> OptionParser<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usage banner, or `None` if nothing has set one yet.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn set_banner(&mut self, banner: impl Into<String>) {
        self.banner = Some(banner.into());
    }

    /// Registers a switch.
    ///
    /// A later registration takes over any short or long spelling an earlier
    /// switch used; an earlier switch left with no spelling is dropped. This
    /// is how a namespace overrides the built-in `-h, --help`.
    ///
    /// # Panics
    ///
    /// Panics if `parts` contains no flag spec at all, or a malformed one
    /// (`---name`, `--=VALUE`, `- x`).
    pub fn on<I, S>(&mut self, parts: I, action: A) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let switch = Switch::from_parts(parts, action);
        if !switch.has_flag() {
            panic!(
                "switch definition needs at least one flag spec, got only {:?}",
                switch.description
            );
        }

        for existing in &mut self.switches {
            if switch.short.is_some() && existing.short == switch.short {
                existing.short = None;
            }
            if switch.long.is_some() && existing.long == switch.long {
                existing.long = None;
            }
        }
        self.switches.retain(Switch::has_flag);
        self.switches.push(switch);
        self
    }

    /// Removes every switch answering to `flag`. Returns true if any was removed.
    pub fn remove(&mut self, flag: &str) -> bool {
        let before = self.switches.len();
        self.switches.retain(|s| !s.matches(flag));
        before != self.switches.len()
    }

    pub fn has(&self, flag: &str) -> bool {
        self.switches.iter().any(|s| s.matches(flag))
    }

    pub fn switches(&self) -> &[Switch<A>] {
        &self.switches
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    /// Parses `argv` in place.
    ///
    /// On success every recognized flag (and its value) has been removed from
    /// `argv`, which keeps the remaining tokens in their original relative
    /// order. The fired switches are returned in the order they appeared.
    /// On failure `argv` is left untouched.
    pub fn parse(&self, argv: &mut Vec<String>) -> Result<Vec<Fired<'_, A>>, OptionError> {
        let (command, _) = self.to_clap(false);
        let matches = command
            .try_get_matches_from(argv.clone())
            .map_err(OptionError::from_clap)?;
        Ok(self.collect(&matches, argv))
    }

    /// Like [`parse`](Self::parse), with an implicit help switch answering to
    /// whichever of `-h` and `--help` no registered switch claims.
    ///
    /// Returns `Ok(None)`, leaving `argv` untouched, when help was asked for.
    pub fn parse_or_help(
        &self,
        argv: &mut Vec<String>,
    ) -> Result<Option<Vec<Fired<'_, A>>>, OptionError> {
        let (command, has_help) = self.to_clap(true);
        let matches = command
            .try_get_matches_from(argv.clone())
            .map_err(OptionError::from_clap)?;
        if has_help && matches.get_count(HELP_ID) > 0 {
            return Ok(None);
        }
        Ok(Some(self.collect(&matches, argv)))
    }

    fn collect(&self, matches: &clap::ArgMatches, argv: &mut Vec<String>) -> Vec<Fired<'_, A>> {
        let mut fired: Vec<(usize, Fired<'_, A>)> = Vec::new();
        for (idx, switch) in self.switches.iter().enumerate() {
            let id = switch_id(idx);
            if switch.takes_value() {
                if let (Some(indices), Some(values)) = (
                    matches.indices_of(&id),
                    matches.get_many::<String>(&id),
                ) {
                    for (at, value) in indices.zip(values) {
                        fired.push((
                            at,
                            Fired {
                                action: &switch.action,
                                value: Some(value.clone()),
                            },
                        ));
                    }
                }
            } else {
                let count = matches.get_count(&id);
                let at = matches.index_of(&id).unwrap_or(0);
                for _ in 0..count {
                    fired.push((
                        at,
                        Fired {
                            action: &switch.action,
                            value: None,
                        },
                    ));
                }
            }
        }
        fired.sort_by_key(|(at, _)| *at);

        *argv = matches
            .get_many::<String>(POSITIONAL_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        tracing::trace!(fired = fired.len(), remaining = ?argv, "parsed options");
        fired.into_iter().map(|(_, f)| f).collect()
    }

    /// Renders the banner followed by one summary block per switch.
    pub fn render(&self) -> String {
        let mut text = String::new();
        if let Some(banner) = &self.banner {
            text.push_str(banner);
            if !banner.ends_with('\n') {
                text.push('\n');
            }
        }
        for switch in &self.switches {
            switch.summarize(&mut text);
        }
        text
    }

    /// Assembles the clap command; the flag says whether an implicit help
    /// switch was added.
    fn to_clap(&self, with_help: bool) -> (clap::Command, bool) {
        let mut command = clap::Command::new("options")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .infer_long_args(true)
            .color(clap::ColorChoice::Never)
            .arg(
                Arg::new(POSITIONAL_ID)
                    .num_args(1..)
                    .action(ArgAction::Append)
                    .value_parser(clap::value_parser!(String)),
            );

        for (idx, switch) in self.switches.iter().enumerate() {
            let mut arg = Arg::new(switch_id(idx));
            if let Some(short) = switch.short {
                arg = arg.short(short);
            }
            if let Some(long) = &switch.long {
                arg = arg.long(long.clone());
            }
            arg = match &switch.value_name {
                Some(value) => arg
                    .value_name(value.clone())
                    .num_args(1)
                    .allow_hyphen_values(true)
                    .action(ArgAction::Append)
                    .value_parser(clap::value_parser!(String)),
                None => arg.action(ArgAction::Count),
            };
            command = command.arg(arg);
        }

        let help_short = with_help && !self.has("-h");
        let help_long = with_help && !self.has("--help");
        if help_short || help_long {
            let mut help = Arg::new(HELP_ID).action(ArgAction::Count);
            if help_short {
                help = help.short('h');
            }
            if help_long {
                help = help.long("help");
            }
            command = command.arg(help);
        }

        (command, help_short || help_long)
    }
}

fn switch_id(idx: usize) -> String {
    format!("switch-{idx}")
}

/// Splits `exclude-dir DIR` / `exclude-dir=DIR` into name and value placeholder.
fn split_spec(body: &str) -> (&str, Option<&str>) {
    match body.find([' ', '=']) {
        Some(at) => {
            let value = body[at + 1..].trim();
            (&body[..at], (!value.is_empty()).then_some(value))
        }
        None => (body, None),
    }
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line.trim_end());
    text.push('\n');
}
