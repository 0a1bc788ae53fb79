//! Highlighting for usage and diagnostic text.
//!
//! The engine only needs two styles: a green highlight for command names and
//! section headers, and a yellow warning. Whether ANSI codes are emitted is
//! decided once per [`Cli`](crate::Cli) through [`ColorMode`].

use console::Style;

/// Controls whether highlighted text carries ANSI escape codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Follow `console`'s detection for stderr (TTY, `NO_COLOR`, `CLICOLOR`).
    #[default]
    Auto,
    /// Always emit escape codes.
    Always,
    /// Never emit escape codes.
    Never,
}

/// The set of styles used when rendering usage, help, and diagnostics.
#[derive(Debug, Clone)]
pub struct Palette {
    hi: Style,
    warn: Style,
}

impl Palette {
    pub fn new(mode: ColorMode) -> Self {
        let apply = |style: Style| match mode {
            ColorMode::Auto => style.for_stderr(),
            ColorMode::Always => style.force_styling(true),
            ColorMode::Never => style.force_styling(false),
        };
        Self {
            hi: apply(Style::new().green()),
            warn: apply(Style::new().yellow()),
        }
    }

    /// Highlights names, headers, and invitations.
    pub fn hi(&self, text: &str) -> String {
        self.hi.apply_to(text).to_string()
    }

    pub fn warn(&self, text: &str) -> String {
        self.warn.apply_to(text).to_string()
    }

    /// Highlights the leading `word:` segment of a message, if it has one.
    ///
    /// `"error: unexpected argument"` becomes `hi("error:") + " unexpected argument"`.
    pub fn highlight_header(&self, message: &str) -> String {
        match message.find(':') {
            Some(0) | None => message.to_string(),
            Some(idx) => {
                let (head, rest) = message.split_at(idx + 1);
                format!("{}{}", self.hi(head), rest)
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(ColorMode::default())
    }
}
