//! `tmx file-metrics line-count`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use face_dispatch::{CommandParser, HandlerResult, Palette, Request, Scope};

use super::{shared_parameters, Query};

pub fn options(op: &mut CommandParser, req: &mut Request) {
    op.set_syntax(format!("{} [opts] [PATH [PATH [...]]]", op.invocation()));
    op.set_banner(format!(
        "\nShows the linecount of each file, longest first. Show\n\
         percentages of max for each file.   Will go recursively\n\
         into directories.\n{}\n",
        op.usage_string()
    ));

    shared_parameters(op, req);

    req.set("count_comment_lines", true);
    req.set("count_blank_lines", true);
    op.on(
        ["-C", "--no-comments", "don't count lines with '#' or '//' comments"],
        |req, _| {
            req.set("count_comment_lines", false);
        },
    );
    op.on(["-B", "--no-blank-lines", "don't count blank lines"], |req, _| {
        req.set("count_blank_lines", false);
    });
}

pub fn run(scope: &mut Scope<'_>, req: Request) -> HandlerResult {
    let query = Query::from_request(&req)?;
    let mut paths: Vec<PathBuf> = req.into_args().into_iter().map(PathBuf::from).collect();
    if paths.is_empty() {
        paths.push(PathBuf::from("."));
    }
    tracing::debug!(?query, ?paths, "line-count");

    let palette = scope.palette();
    let mut files = Vec::new();
    for path in &paths {
        if !path.exists() {
            let msg = format!("no such file or directory: {}", path.display());
            writeln!(scope.err(), "{}", palette.warn(&msg))?;
            continue;
        }
        if query.show_commands {
            writeln!(
                scope.out(),
                "{} | xargs wc -l",
                query.find_command(path)
            )?;
        }
        files.extend(query.find_files(path)?);
    }

    if query.show_files_list {
        for file in &files {
            writeln!(scope.out(), "{}", file.display())?;
        }
    }

    if !query.show_report {
        return Ok(());
    }
    if files.is_empty() {
        writeln!(scope.err(), "{}", palette.warn("no files found."))?;
        return Ok(());
    }

    let report = Report::build(&files, &query)?;
    report.write(scope.out(), palette)?;
    Ok(())
}

/// Which lines a count includes.
#[derive(Debug, Clone, Copy)]
pub struct Counting {
    pub comments: bool,
    pub blanks: bool,
}

impl From<&Query> for Counting {
    fn from(query: &Query) -> Self {
        Self {
            comments: query.count_comment_lines,
            blanks: query.count_blank_lines,
        }
    }
}

/// Counts the lines of `text` that `counting` includes.
pub fn count_lines(text: &str, counting: Counting) -> usize {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return counting.blanks;
            }
            counting.comments || !(trimmed.starts_with('#') || trimmed.starts_with("//"))
        })
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub path: PathBuf,
    pub lines: usize,
}

/// Line counts, longest file first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    rows: Vec<Row>,
}

impl Report {
    pub fn build(files: &[PathBuf], query: &Query) -> io::Result<Self> {
        let counting = Counting::from(query);
        let mut rows = files
            .iter()
            .map(|path| {
                let lines = count_lines(&read_lossy(path)?, counting);
                Ok(Row {
                    path: path.clone(),
                    lines,
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        rows.sort_by(|a, b| b.lines.cmp(&a.lines).then_with(|| a.path.cmp(&b.path)));
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.lines).sum()
    }

    /// One row per file (`lines  percent-of-max  path`), then a total line.
    pub fn write(&self, out: &mut dyn Write, palette: &Palette) -> io::Result<()> {
        let max = self.rows.first().map_or(0, |r| r.lines);
        let width = max.to_string().len();
        for row in &self.rows {
            let percent = if max == 0 {
                0.0
            } else {
                row.lines as f64 * 100.0 / max as f64
            };
            writeln!(
                out,
                "{:>width$}  {percent:>6.2}%  {}",
                row.lines,
                row.path.display()
            )?;
        }
        let count = self.rows.len();
        let plural = if count == 1 { "" } else { "s" };
        writeln!(
            out,
            "{}",
            palette.hi(&format!("total: {} lines in {count} file{plural}", self.total()))
        )
    }
}

fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
