use std::io::Write;
use std::sync::Arc;
use std::thread;

use face_dispatch::{
    Arity, Cli, ColorMode, CommandDef, DispatchError, Rejection, RunResult,
};

struct Run {
    result: RunResult,
    out: String,
    err: String,
}

fn run(cli: &Cli, argv: &[&str]) -> Run {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let result = cli
        .run_with(argv.iter().copied(), &mut out, &mut err)
        .unwrap();
    Run {
        result,
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
    }
}

fn line_count() -> CommandDef {
    CommandDef::new("line-count")
        .options_with_request(|op, req| {
            op.set_syntax(format!("{} [opts] [PATH [PATH [...]]]", op.invocation()));
            req.set("count_comment_lines", true);
            req.set("count_blank_lines", true);
            op.on(["-C", "--no-comments", "don't count comments"], |req, _| {
                req.set("count_comment_lines", false);
            });
            op.on(["-B", "--no-blank-lines", "don't count blank lines"], |req, _| {
                req.set("count_blank_lines", false);
            });
        })
        .handler(Arity::any(), |scope, req| {
            writeln!(
                scope.out(),
                "comments={} blanks={} args={:?}",
                req.flag("count_comment_lines"),
                req.flag("count_blank_lines"),
                req.args()
            )?;
            Ok(())
        })
}

fn tmx() -> Cli {
    Cli::builder()
        .program_name("tmx")
        .version("0.1.0")
        .colors(ColorMode::Never)
        .namespace("file-metrics", |ns| {
            ns.command(line_count())
                .command(CommandDef::new("list").handler(Arity::exactly(1), |scope, req| {
                    writeln!(scope.out(), "list {}", req.args()[0])?;
                    Ok(())
                }))
        })
        .build()
        .unwrap()
}

fn path(names: &[&str]) -> RunResult {
    RunResult::Handled(names.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_flag_is_removed_and_defaults_survive() {
    let run = run(&tmx(), &["file-metrics", "line-count", "-C", "src/"]);

    assert_eq!(run.result, path(&["file-metrics", "line-count"]));
    assert_eq!(run.out, "comments=false blanks=true args=[\"src/\"]\n");
    assert!(run.err.is_empty());
}

#[test]
fn test_unique_prefix_resolves() {
    let run = run(&tmx(), &["file-metrics", "line", "src/"]);

    assert_eq!(run.result, path(&["file-metrics", "line-count"]));
    assert_eq!(run.out, "comments=true blanks=true args=[\"src/\"]\n");
}

#[test]
fn test_prefixes_at_every_level() {
    let run = run(&tmx(), &["file", "lin", "-B"]);

    assert_eq!(run.result, path(&["file-metrics", "line-count"]));
    assert_eq!(run.out, "comments=true blanks=false args=[]\n");
}

#[test]
fn test_shared_prefix_is_ambiguous() {
    let run = run(&tmx(), &["file-metrics", "l"]);

    assert_eq!(
        run.result,
        RunResult::Rejected(Rejection::Ambiguous {
            given: "l".into(),
            candidates: vec!["line-count".into(), "list".into()],
        })
    );
    assert_eq!(run.result.exit_code(), 2);
    assert!(run.out.is_empty());
    assert_eq!(
        run.err,
        "Ambiguous command: \"l\". Did you mean line-count or list?\n\
         usage: tmx file-metrics {line-count|list} [opts] [args]\n\
         Try tmx file-metrics -h for help.\n"
    );
}

#[test]
fn test_exact_name_beats_longer_sibling() {
    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .command(CommandDef::new("listing").handler(Arity::any(), |scope, _| {
            writeln!(scope.out(), "listing")?;
            Ok(())
        }))
        .command(CommandDef::new("list").handler(Arity::any(), |scope, _| {
            writeln!(scope.out(), "list")?;
            Ok(())
        }))
        .build()
        .unwrap();

    assert_eq!(run(&cli, &["list"]).out, "list\n");
    assert_eq!(run(&cli, &["listi"]).out, "listing\n");
}

#[test]
fn test_empty_argv_at_root() {
    let run = run(&tmx(), &[]);

    assert_eq!(
        run.result,
        RunResult::Rejected(Rejection::Empty {
            namespace: "tmx".into()
        })
    );
    assert_eq!(
        run.err,
        "usage: tmx {file-metrics} [opts] [args]\nTry tmx -h for help.\n"
    );
}

#[test]
fn test_empty_argv_in_namespace() {
    let run = run(&tmx(), &["file-metrics"]);

    assert_eq!(
        run.err,
        "usage: tmx file-metrics {line-count|list} [opts] [args]\nTry tmx file-metrics -h for help.\n"
    );
}

#[test]
fn test_unrecognized_command() {
    let run = run(&tmx(), &["frob"]);

    assert_eq!(
        run.result,
        RunResult::Rejected(Rejection::Unrecognized {
            given: "frob".into()
        })
    );
    assert_eq!(
        run.err,
        "Unrecognized command: \"frob\". Expecting: file-metrics\n\
         usage: tmx {file-metrics} [opts] [args]\n\
         Try tmx -h for help.\n"
    );
}

#[test]
fn test_missing_argument_reports_positional_counts() {
    let run = run(&tmx(), &["file-metrics", "list"]);

    match &run.result {
        RunResult::Rejected(Rejection::ArgumentCount(e)) => {
            assert_eq!(e.given, 0);
            assert_eq!(e.expected, Arity::exactly(1));
        }
        other => panic!("expected ArgumentCount, got {other:?}"),
    }
    assert!(run.out.is_empty());
    assert_eq!(
        run.err,
        "wrong number of arguments (0 for 1)\n\
         usage: tmx file-metrics list [opts] [args]\n\
         Try tmx file-metrics list -h for help.\n"
    );
}

#[test]
fn test_too_many_arguments() {
    let run = run(&tmx(), &["file-metrics", "list", "a", "b"]);
    assert!(run.err.starts_with("wrong number of arguments (2 for 1)\n"));
}

#[test]
fn test_invalid_command_option() {
    let run = run(&tmx(), &["file-metrics", "line-count", "--bogus", "src/"]);

    assert!(matches!(
        run.result,
        RunResult::Rejected(Rejection::InvalidOption { .. })
    ));
    assert!(run.out.is_empty());
    let mut lines = run.err.lines();
    let first = lines.next().unwrap();
    assert!(first.starts_with("error:"), "{first}");
    assert!(first.contains("--bogus"), "{first}");
    assert_eq!(lines.next(), Some("Try tmx file-metrics line-count -h for help."));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_abbreviated_long_flag() {
    let run = run(&tmx(), &["file-metrics", "line-count", "--no-c", "a", "b"]);
    assert_eq!(run.out, "comments=false blanks=true args=[\"a\", \"b\"]\n");
}

#[test]
fn test_double_dash_ends_flags() {
    let run = run(&tmx(), &["file-metrics", "line-count", "--", "-C"]);
    assert_eq!(run.out, "comments=true blanks=true args=[\"-C\"]\n");
}

#[test]
fn test_namespace_help() {
    let run = run(&tmx(), &["file-metrics", "-h"]);

    assert_eq!(run.result, RunResult::Options);
    assert_eq!(
        run.err,
        "usage: tmx file-metrics {line-count|list} [opts] [args]\n\
         \x20      tmx file-metrics {-h}\n\
         options:\n\
         \x20   -h, --help                       show this screen\n\
         commands:\n\
         Try tmx file-metrics [cmd] -h for command help.\n"
    );

    let rows: Vec<&str> = run.out.lines().collect();
    assert_eq!(
        rows[0],
        "  line-count  tmx file-metrics line-count [opts] [PATH [PATH [...]]]"
    );
    assert!(rows[1].starts_with("              "));
    assert!(rows[1].contains("-C, --no-comments"));
    assert!(rows[2].contains("-B, --no-blank-lines"));
    assert_eq!(rows[3], "        list  tmx file-metrics list [opts] [args]");
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_root_help_lists_namespace_summary() {
    let run = run(&tmx(), &["--help"]);

    assert!(run.err.starts_with(
        "usage: tmx {file-metrics} [opts] [args]\n       tmx {-h|-v}\noptions:\n"
    ));
    assert!(run.err.contains("-v, --version"));
    assert_eq!(run.out, "  file-metrics  child commands: {line-count|list}\n");
}

#[test]
fn test_command_help() {
    let run = run(&tmx(), &["file-metrics", "line-count", "-h"]);

    assert_eq!(run.result, RunResult::Options);
    assert!(run.out.is_empty());
    assert!(run
        .err
        .starts_with("usage: tmx file-metrics line-count [opts] [PATH [PATH [...]]]\n"));
    assert!(run.err.contains("-B, --no-blank-lines"));
}

#[test]
fn test_command_help_in_bundled_flags() {
    let run = run(&tmx(), &["file-metrics", "line-count", "-Ch"]);

    assert_eq!(run.result, RunResult::Options);
    assert!(run.out.is_empty());
    assert!(run.err.starts_with("usage: tmx file-metrics line-count"));
}

fn finder() -> Cli {
    Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .command(
            CommandDef::new("find")
                .options_with_request(|op, req| {
                    req.set("names", Vec::<String>::new());
                    op.on(["-n", "--name NAME", "basename pattern"], |req, name| {
                        if let Some(name) = name {
                            req.push("names", name);
                        }
                    });
                })
                .handler(Arity::any(), |scope, req| {
                    writeln!(scope.out(), "{}", req.options()["names"])?;
                    Ok(())
                }),
        )
        .build()
        .unwrap()
}

#[test]
fn test_flag_values_may_look_like_flags() {
    let help_like = run(&finder(), &["find", "-n", "-h"]);
    assert_eq!(help_like.result, path(&["find"]));
    assert_eq!(help_like.out, "[\"-h\"]\n");
    assert!(help_like.err.is_empty());

    let dashed = run(&finder(), &["find", "-n", "-foo", "--name", "-*.rs"]);
    assert_eq!(dashed.result, path(&["find"]));
    assert_eq!(dashed.out, "[\"-foo\",\"-*.rs\"]\n");
}

#[test]
fn test_version() {
    let run = run(&tmx(), &["-v"]);

    assert_eq!(run.result, RunResult::Options);
    assert_eq!(run.result.exit_code(), 0);
    assert_eq!(run.err, "tmx 0.1.0\n");
    assert!(run.out.is_empty());
}

#[test]
fn test_version_callback() {
    let cli = Cli::builder()
        .program_name("tmx")
        .colors(ColorMode::Never)
        .version(face_dispatch::Version::callback(|| "1.2.3".to_string()))
        .build()
        .unwrap();

    assert_eq!(run(&cli, &["--version"]).err, "tmx 1.2.3\n");
}

#[test]
fn test_leftovers_after_namespace_options_are_ignored() {
    let run = run(&tmx(), &["-v", "extra", "more"]);
    assert_eq!(run.err, "tmx 0.1.0\n(ignoring: \"extra\", \"more\")\n");
}

#[test]
fn test_invalid_namespace_option() {
    let run = run(&tmx(), &["file-metrics", "-x"]);

    assert!(matches!(
        run.result,
        RunResult::Rejected(Rejection::InvalidOption { .. })
    ));
    assert!(run.err.starts_with("error:"));
    assert!(run.err.ends_with("Try tmx file-metrics -h for help.\n"));
}

#[test]
fn test_overridden_help() {
    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .namespace("db", |ns| {
            ns.on(["-h", "--help", "db help"], |scope, _| {
                let invocation = scope.invocation();
                writeln!(scope.out(), "custom help for {invocation}")?;
                Ok(())
            })
            .command(CommandDef::new("migrate").handler(Arity::none(), |_, _| Ok(())))
        })
        .build()
        .unwrap();

    let run = run(&cli, &["db", "--help"]);
    assert_eq!(run.out, "custom help for app db\n");
    assert!(run.err.is_empty());
}

#[test]
fn test_removed_help() {
    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .namespace("db", |ns| {
            ns.remove_option("-h")
                .command(CommandDef::new("migrate").handler(Arity::none(), |_, _| Ok(())))
        })
        .build()
        .unwrap();

    let run = run(&cli, &["db", "-h"]);
    assert!(matches!(
        run.result,
        RunResult::Rejected(Rejection::InvalidOption { .. })
    ));
}

#[test]
fn test_namespace_flag_with_value() {
    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .on(["-e", "--echo TEXT", "print TEXT"], |scope, value| {
            writeln!(scope.out(), "{}", value.unwrap_or_default())?;
            Ok(())
        })
        .build()
        .unwrap();

    let run = run(&cli, &["--echo=hello", "-e", "world"]);
    assert_eq!(run.out, "hello\nworld\n");
}

#[test]
fn test_handler_receiver_is_owning_namespace() {
    struct Greeting(&'static str);
    struct Punctuation(char);

    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .service(Greeting("hello"))
        .namespace("outer", |ns| {
            ns.service(Punctuation('!')).namespace("inner", |ns| {
                ns.command(CommandDef::new("greet").handler(Arity::exactly(1), |scope, req| {
                    let greeting = scope.require_service::<Greeting>()?;
                    let punctuation = scope.require_service::<Punctuation>()?;
                    let invocation = scope.invocation();
                    writeln!(
                        scope.out(),
                        "{invocation}: {} {}{}",
                        greeting.0,
                        req.args()[0],
                        punctuation.0
                    )?;
                    Ok(())
                }))
            })
        })
        .build()
        .unwrap();

    let run = run(&cli, &["o", "i", "g", "world"]);
    assert_eq!(run.result, path(&["outer", "inner", "greet"]));
    assert_eq!(run.out, "app outer inner: hello world!\n");
}

#[test]
fn test_missing_service_is_handler_error() {
    struct Missing;

    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .command(CommandDef::new("go").handler(Arity::none(), |scope, _| {
            scope.require_service::<Missing>()?;
            Ok(())
        }))
        .build()
        .unwrap();

    let mut out = Vec::new();
    let mut err = Vec::new();
    match cli.run_with(["go"], &mut out, &mut err) {
        Err(DispatchError::Handler(e)) => assert!(e.to_string().contains("service missing")),
        other => panic!("expected handler error, got {other:?}"),
    }
}

#[test]
fn test_routine_registry() {
    let cli = Cli::builder()
        .program_name("app")
        .colors(ColorMode::Never)
        .command(CommandDef::new("line-count").options(|op| {
            op.set_banner("counts lines");
        }))
        .routine("line_count", Arity::any(), |scope, _| {
            writeln!(scope.out(), "declared")?;
            Ok(())
        })
        .routine("status", Arity::none(), |scope, _| {
            writeln!(scope.out(), "implicit")?;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(run(&cli, &["line"]).out, "declared\n");
    assert_eq!(run(&cli, &["status"]).out, "implicit\n");

    let help = run(&cli, &["-h"]);
    assert_eq!(
        help.out,
        "  line-count  counts lines\n      status  app status [opts] [args]\n"
    );
}

#[test]
fn test_parser_is_built_once_across_runs() {
    let cli = tmx();
    let before = cli.root().children()[0]
        .as_namespace()
        .unwrap()
        .children()[0]
        .as_command()
        .unwrap()
        .option_parser() as *const _;

    run(&cli, &["file-metrics", "line-count", "-C"]);
    run(&cli, &["file-metrics", "line-count"]);

    let after = cli.root().children()[0]
        .as_namespace()
        .unwrap()
        .children()[0]
        .as_command()
        .unwrap()
        .option_parser() as *const _;
    assert_eq!(before, after);
}

#[test]
fn test_concurrent_runs_share_one_tree() {
    let cli = Arc::new(tmx());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cli = Arc::clone(&cli);
            thread::spawn(move || {
                let target = format!("dir{i}");
                let flag = if i % 2 == 0 { "-C" } else { "-B" };
                let mut out = Vec::new();
                let mut err = Vec::new();
                let result = cli
                    .run_with(
                        ["file-metrics", "line-count", flag, target.as_str()],
                        &mut out,
                        &mut err,
                    )
                    .unwrap();
                (i, result, String::from_utf8(out).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (i, result, out) = handle.join().unwrap();
        assert!(result.is_handled());
        let expected = if i % 2 == 0 {
            format!("comments=false blanks=true args=[\"dir{i}\"]\n")
        } else {
            format!("comments=true blanks=false args=[\"dir{i}\"]\n")
        };
        assert_eq!(out, expected);
    }
}
