use std::sync::{Arc, Mutex};
use std::time::Duration;

use cmdtree::{
    Cancellation, CommandTree, Env, Error, ParseError, Violation, arg, command, flag, help_flag,
};
use serial_test::serial;

#[derive(Debug, Default, Clone, PartialEq)]
struct Seen {
    command: String,
    message: Option<String>,
    all: Option<bool>,
    branch: Option<String>,
    rest: Vec<String>,
    paths: Vec<String>,
    port: Option<i64>,
}

fn git(seen: Arc<Mutex<Seen>>) -> CommandTree {
    let commit_seen = Arc::clone(&seen);
    let checkout_seen = Arc::clone(&seen);
    let add_seen = Arc::clone(&seen);
    let serve_seen = Arc::clone(&seen);

    command("git", "the stupid content tracker")
        .version("2.43.0")
        .flag(help_flag().short('h').inherited())
        .flag(flag("verbose", "Be verbose").short('v').default(false).inherited())
        .sub_command(
            command("commit", "Record changes")
                .alias("ci")
                .flag(flag("message", "Commit message").alias("msg").short('m'))
                .flag(flag("all", "Stage all").short('a').default(false))
                .handler(move |ctx| {
                    let mut seen = commit_seen.lock().unwrap();
                    seen.command = ctx.qualified_name();
                    seen.message = Some(ctx.flag("message")?);
                    seen.all = Some(ctx.flag("all")?);
                    Ok(())
                }),
        )
        .sub_command(
            command("checkout", "Switch branches")
                .arg(arg("branch", "Branch to check out"))
                .handler(move |ctx| {
                    let mut seen = checkout_seen.lock().unwrap();
                    seen.command = ctx.qualified_name();
                    seen.branch = Some(ctx.arg("branch")?);
                    seen.rest = ctx.rest().to_vec();
                    Ok(())
                }),
        )
        .sub_command(
            command("add", "Add file contents")
                .arg(arg("paths", "Files to add").variadic())
                .handler(move |ctx| {
                    let mut seen = add_seen.lock().unwrap();
                    seen.command = ctx.qualified_name();
                    seen.paths = ctx.variadic_arg("paths")?;
                    Ok(())
                }),
        )
        .sub_command(
            command("daemon", "Serve repositories")
                .flag(flag("port", "Port to listen on").default(3000i64).env("PORT"))
                .handler(move |ctx| {
                    let mut seen = serve_seen.lock().unwrap();
                    seen.command = ctx.qualified_name();
                    seen.port = Some(ctx.flag("port")?);
                    Ok(())
                }),
        )
        .build()
        .unwrap()
}

fn run(tokens: &[&str], env: &Env) -> Result<Seen, Error> {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let mut tree = git(Arc::clone(&seen));
    let mut out = Vec::new();
    tree.run_with(tokens.iter().copied(), env, &Cancellation::new(), &mut out)?;
    let result = seen.lock().unwrap().clone();
    Ok(result)
}

fn no_env() -> Env {
    Env::fixed::<_, &str, &str>([])
}

#[test]
fn commit_with_short_group() {
    let seen = run(&["commit", "-am", "hello"], &no_env()).unwrap();
    assert_eq!(seen.command, "git commit");
    assert_eq!(seen.message.as_deref(), Some("hello"));
    assert_eq!(seen.all, Some(true));
}

#[test]
fn commit_through_alias_and_long_alias() {
    let seen = run(&["ci", "--msg=fix: typo"], &no_env()).unwrap();
    assert_eq!(seen.command, "git commit");
    assert_eq!(seen.message.as_deref(), Some("fix: typo"));
    assert_eq!(seen.all, Some(false));
}

#[test]
fn checkout_collects_rest_after_terminator() {
    let seen = run(
        &["checkout", "some-branch", "--", "extra", "--tokens"],
        &no_env(),
    )
    .unwrap();
    assert_eq!(seen.branch.as_deref(), Some("some-branch"));
    assert_eq!(seen.rest, ["extra", "--tokens"]);
}

#[test]
fn checkout_requires_a_branch() {
    match run(&["checkout"], &no_env()).unwrap_err() {
        Error::Parse(ParseError::ArgumentMissingValue { names }) => {
            assert_eq!(names, ["branch"])
        }
        other => panic!("expected ArgumentMissingValue, got: {other:?}"),
    }
}

#[test]
fn add_with_zero_and_many_paths() {
    assert!(run(&["add"], &no_env()).unwrap().paths.is_empty());

    let seen = run(&["-v", "add", "a.rs", "b.rs", "c.rs"], &no_env()).unwrap();
    assert_eq!(seen.paths, ["a.rs", "b.rs", "c.rs"]);
}

#[test]
fn daemon_port_default_flag_and_fixed_env() {
    assert_eq!(run(&["daemon"], &no_env()).unwrap().port, Some(3000));
    assert_eq!(
        run(&["daemon", "--port", "8080"], &no_env()).unwrap().port,
        Some(8080)
    );
    assert_eq!(
        run(&["daemon"], &Env::fixed([("PORT", "9418")])).unwrap().port,
        Some(9418)
    );
}

#[test]
#[serial]
fn daemon_port_from_process_env() {
    // SAFETY: serialised with every other test touching the environment.
    unsafe { std::env::set_var("PORT", "4000") };
    let from_env = run(&["daemon"], &Env::Process);
    let explicit = run(&["daemon", "-h"], &Env::Process);
    unsafe { std::env::remove_var("PORT") };

    assert_eq!(from_env.unwrap().port, Some(4000));
    // Help does not run the handler.
    assert_eq!(explicit.unwrap().port, None);
}

#[test]
#[serial]
fn bad_env_value_fails_the_handler() {
    // SAFETY: serialised with every other test touching the environment.
    unsafe { std::env::set_var("PORT", "not-a-port") };
    let result = run(&["daemon"], &Env::Process);
    unsafe { std::env::remove_var("PORT") };

    match result.unwrap_err() {
        Error::Handler(err) => {
            let lookup = err.downcast_ref::<cmdtree::LookupError>().unwrap();
            assert!(matches!(lookup, cmdtree::LookupError::Env { .. }));
        }
        other => panic!("expected handler error, got: {other:?}"),
    }
}

#[test]
fn bool_toggle_law() {
    let mut tree = command("app", "")
        .flag(flag("color", "").short('c').default(true))
        .flag(flag("quiet", "").short('q').default(false))
        .handler(|_| Ok(()))
        .build()
        .unwrap();

    tree.parse(["--color", "--quiet"]).unwrap();
    let root = tree.root();
    assert_eq!(root.flags()[0].value().and_then(|v| v.as_bool()), Some(false));
    assert_eq!(root.flags()[1].value().and_then(|v| v.as_bool()), Some(true));

    tree.parse(["-c"]).unwrap();
    assert_eq!(tree.root().flags()[0].value().and_then(|v| v.as_bool()), Some(false));

    tree.parse(["-qc"]).unwrap();
    let root = tree.root();
    assert_eq!(root.flags()[0].value().and_then(|v| v.as_bool()), Some(false));
    assert_eq!(root.flags()[1].value().and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn typed_variadic_rejects_bad_tokens() {
    let mut tree = command("sleep", "")
        .arg(arg("durations", "").value_type("duration").variadic())
        .handler(|ctx| {
            let total: Duration = ctx.variadic_arg::<Duration>("durations")?.into_iter().sum();
            assert_eq!(total, Duration::from_millis(1500));
            Ok(())
        })
        .build()
        .unwrap();

    let mut out = Vec::new();
    tree.run_with(["1s", "500ms"], &no_env(), &Cancellation::new(), &mut out)
        .unwrap();

    match tree
        .run_with(["1s", "soon"], &no_env(), &Cancellation::new(), &mut out)
        .unwrap_err()
    {
        Error::Parse(ParseError::InvalidValue { target, raw, .. }) => {
            assert_eq!(target, "argument \"durations\"");
            assert_eq!(raw, "soon");
        }
        other => panic!("expected InvalidValue, got: {other:?}"),
    }
}

#[test]
fn build_errors_are_reported_together() {
    let err = command("app", "")
        .arg(arg("files", "").variadic())
        .arg(arg("out", ""))
        .sub_command(command("x", ""))
        .build()
        .unwrap_err();
    assert_eq!(
        err.violations(),
        [
            Violation::VariadicNotLast {
                name: "files".to_string(),
                position: 1
            },
            Violation::SubCommandsAndArguments,
        ]
    );
    assert!(err.to_string().starts_with("invalid command \"app\": "));
}

#[test]
fn help_lists_sub_commands() {
    let mut tree = git(Arc::new(Mutex::new(Seen::default())));
    let mut out = Vec::new();
    tree.run_with(["--help"], &no_env(), &Cancellation::new(), &mut out)
        .unwrap();
    let help = String::from_utf8(out).unwrap();
    assert!(help.starts_with("git 2.43.0: the stupid content tracker\n"));
    assert!(help.contains("  git [flags] [sub-commands]\n"));
    assert!(help.contains("  commit: Record changes\n"));
}
