//! The `file-metrics` namespace.
//!
//! Commands here share one set of file-selection flags (see
//! [`shared_parameters`]) and read them back as a typed [`Query`].

pub mod line_count;

use std::path::{Path, PathBuf};

use face_dispatch::{Arity, CommandDef, CommandParser, NamespaceBuilder, Request};
use glob::Pattern;
use serde::Deserialize;
use walkdir::WalkDir;

/// Adds the file-metrics commands and their routines to `ns`.
pub fn namespace(ns: NamespaceBuilder) -> NamespaceBuilder {
    ns.command(CommandDef::new("line-count").options_with_request(line_count::options))
        .routine("line_count", Arity::any(), line_count::run)
}

/// File-selection flags common to every file-metrics command.
pub fn shared_parameters(op: &mut CommandParser, req: &mut Request) {
    req.set("exclude_dirs", vec![".*"]);
    op.on(
        [
            "-D",
            "--exclude-dir DIR",
            "Folders whose basename match this pattern will not be",
            "descended into.  It can be specified multiple times",
            "with multiple patterns to narrow the search.",
            "If not provided, the default is to skip folders whose",
            "name starts with a '.' (period).  To include such",
            "dirs, specify \"--exclude-dir=[]\" the first time you",
            "use this option in the command.  (it has the effect",
            "of clearing the list of directories to skip)",
        ],
        |req, dir| match dir {
            Some("[]") => {
                req.clear("exclude_dirs");
            }
            Some(dir) => {
                req.push("exclude_dirs", dir);
            }
            None => {}
        },
    );

    req.set("include_names", Vec::<String>::new());
    op.on(
        [
            "-n",
            "--name NAME",
            "e.g. --name='*.rs'.  When present, this limits the",
            "files analyzed to the ones whose basename matches",
            "this pattern. It can be specified multiple times to",
            "add multiple filename patterns, which will broaden",
            "the search.  You should use single quotes to avoid",
            "shell expansion.",
            " ",
            "When PATH is a file, this option is ignored.",
        ],
        |req, pattern| {
            if let Some(pattern) = pattern {
                req.push("include_names", pattern);
            }
        },
    );

    op.on(
        ["-c", "--commands", "show the equivalent {find|wc} commands"],
        |req, _| {
            req.set("show_commands", true);
        },
    );

    op.on(
        [
            "-l",
            "--list",
            "list the resulting files that match the query (before running reports)",
        ],
        |req, _| {
            req.set("show_files_list", true);
        },
    );

    req.set("show_report", true);
    op.on(["-R", "--no-report", "don't actually run the whole report"], |req, _| {
        req.set("show_report", false);
    });
}

/// The parsed file-selection flags, plus whatever the command adds.
#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    pub exclude_dirs: Vec<String>,
    pub include_names: Vec<String>,
    #[serde(default)]
    pub show_commands: bool,
    #[serde(default)]
    pub show_files_list: bool,
    pub show_report: bool,
    #[serde(default = "enabled")]
    pub count_comment_lines: bool,
    #[serde(default = "enabled")]
    pub count_blank_lines: bool,
}

fn enabled() -> bool {
    true
}

impl Query {
    pub fn from_request(req: &Request) -> anyhow::Result<Self> {
        let options = serde_json::Value::Object(req.options().clone());
        Ok(serde_json::from_value(options)?)
    }

    /// Files under `path` this query selects, in file-name order.
    ///
    /// A `path` naming a file is returned as is; the name patterns only
    /// apply while descending into directories.
    pub fn find_files(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let exclude = compile(&self.exclude_dirs)?;
        let include = compile(&self.include_names)?;

        let mut files = Vec::new();
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_type().is_dir() || !matches_any(&exclude, e.file_name())
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if include.is_empty() || matches_any(&include, entry.file_name()) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(path = %path.display(), files = files.len(), "collected files");
        Ok(files)
    }

    /// The `find` pipeline that selects the same files as [`find_files`](Self::find_files).
    pub fn find_command(&self, path: &Path) -> String {
        let mut parts = vec!["find".to_string(), quote(&path.display().to_string())];
        if !self.exclude_dirs.is_empty() {
            parts.push(format!(
                "-mindepth 1 -type d \\( {} \\) -prune -o",
                name_tests(&self.exclude_dirs)
            ));
        }
        parts.push("-type f".to_string());
        if !self.include_names.is_empty() {
            parts.push(format!("\\( {} \\)", name_tests(&self.include_names)));
        }
        parts.push("-print".to_string());
        parts.join(" ")
    }
}

fn compile(patterns: &[String]) -> anyhow::Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(|e| anyhow::anyhow!("bad pattern {p:?}: {e}")))
        .collect()
}

fn matches_any(patterns: &[Pattern], name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    patterns.iter().any(|p| p.matches(&name))
}

fn name_tests(patterns: &[String]) -> String {
    patterns
        .iter()
        .map(|p| format!("-name {}", quote(p)))
        .collect::<Vec<_>>()
        .join(" -o ")
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
