use std::fs;
use std::process::{Command, Output};

fn minigit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_minigit"));
    cmd.env_remove("PORT")
        .env_remove("GIT_DIR")
        .env_remove("COMP_LINE")
        .env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    minigit()
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run minigit {args:?}: {e}"))
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn help_lists_sub_commands() {
    let out = run(&["--help"]);
    assert_success(&out, "minigit --help");
    let text = stdout(&out);
    assert!(
        text.starts_with(&format!(
            "minigit {}: a tiny git-flavoured command line\n",
            env!("CARGO_PKG_VERSION")
        )),
        "unexpected help output:\n{text}"
    );
    assert!(text.contains("  commit: Record changes to the repository.\n"));
    assert!(!text.contains("fail:"), "hidden command leaked:\n{text}");
}

#[test]
fn no_sub_command_prints_help() {
    let out = run(&[]);
    assert_success(&out, "minigit");
    assert!(stdout(&out).contains("Usage:\n  minigit [flags] [sub-commands]\n"));
}

#[test]
fn version_flag() {
    let out = run(&["-V"]);
    assert_success(&out, "minigit -V");
    assert_eq!(stdout(&out), format!("{}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn commit_short_group() {
    let out = run(&["commit", "-am", "hello"]);
    assert_success(&out, "minigit commit -am hello");
    assert_eq!(
        stdout(&out),
        "staged all modified files in .git\n[.git] hello\n"
    );
}

#[test]
fn commit_without_message_fails() {
    let out = run(&["commit"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("empty commit message"),
        "unexpected stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn sub_command_help_shows_inherited_flags() {
    let out = run(&["commit", "--help"]);
    assert_success(&out, "minigit commit --help");
    let text = stdout(&out);
    assert!(text.contains("  minigit commit [flags]\n"), "{text}");
    assert!(text.contains("--message --msg"), "{text}");
    assert!(text.contains("--git-dir"), "{text}");
    assert!(!text.contains("--version"), "{text}");
}

#[test]
fn checkout_with_rest() {
    let out = run(&["checkout", "some-branch", "--", "extra", "tokens"]);
    assert_success(&out, "minigit checkout");
    assert_eq!(
        stdout(&out),
        "Switched to branch 'some-branch'\nrestored 'extra'\nrestored 'tokens'\n"
    );
}

#[test]
fn checkout_missing_branch_is_a_parse_error() {
    let out = run(&["co", "-b"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("argument missing value: \"branch\""),
        "unexpected stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn add_variadic_paths() {
    let out = run(&["add", "a.rs", "b.rs"]);
    assert_success(&out, "minigit add");
    assert_eq!(stdout(&out), "add 'a.rs'\nadd 'b.rs'\n");

    let out = run(&["add"]);
    assert_success(&out, "minigit add");
    assert_eq!(stdout(&out), "Nothing specified, nothing added.\n");
}

#[test]
fn serve_port_default_flag_and_env() {
    let out = run(&["serve"]);
    assert_success(&out, "minigit serve");
    assert_eq!(
        stdout(&out),
        "serving .git on http://127.0.0.1:3000 (idle timeout 30s)\n"
    );

    let out = run(&["serve", "--port", "8080", "--timeout=1m"]);
    assert_success(&out, "minigit serve --port 8080");
    assert!(stdout(&out).contains(":8080 (idle timeout 1m)"));

    let out = minigit()
        .args(["serve"])
        .env("PORT", "4000")
        .env("GIT_DIR", "/srv/repo.git")
        .output()
        .expect("failed to run minigit serve");
    assert_success(&out, "PORT=4000 minigit serve");
    assert!(stdout(&out).starts_with("serving /srv/repo.git on http://127.0.0.1:4000"));
}

#[test]
fn invalid_flag_value_exits_one() {
    let out = run(&["serve", "-p", "99999"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("parsing provided value \"99999\""));
}

#[test]
fn unknown_flag_exits_one() {
    let out = run(&["--bogus"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no flag found for \"--bogus\""));
}

#[cfg(unix)]
#[test]
fn non_utf8_argument_is_reported() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let out = minigit()
        .arg("add")
        .arg(OsString::from_vec(vec![b'f', 0xff]))
        .output()
        .expect("failed to run minigit add");
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("token 2 is not valid UTF-8"),
        "unexpected stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn exit_error_selects_the_code() {
    let out = run(&["fail", "3"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("exit status 3"));
}

#[cfg(unix)]
#[test]
fn subprocess_status_is_propagated() {
    let out = run(&["exec", "--", "sh", "-c", "exit 5"]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn complete_from_arguments_and_comp_line() {
    let out = run(&["__complete", "c"]);
    assert_success(&out, "minigit __complete c");
    assert_eq!(stdout(&out), "checkout\nci\nco\ncommit\ncompletion\n");

    let out = minigit()
        .arg("__complete")
        .env("COMP_LINE", "minigit commit --m")
        .output()
        .expect("failed to run minigit __complete");
    assert_success(&out, "COMP_LINE minigit __complete");
    assert_eq!(stdout(&out), "--message\n--msg\n");
}

#[test]
fn completion_scripts() {
    let out = run(&["completion", "bash"]);
    assert_success(&out, "minigit completion bash");
    assert!(stdout(&out).contains("complete -F _minigit_completion minigit"));

    let out = run(&["completion", "zsh"]);
    assert_success(&out, "minigit completion zsh");
    let script = stdout(&out);
    assert!(script.starts_with("#compdef minigit\n"));
    assert!(script.contains("_minigit_serve() {"));
}

#[test]
fn schema_is_json() {
    let out = run(&["schema"]);
    assert_success(&out, "minigit schema");
    let schema: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("schema output is not JSON");
    assert_eq!(schema["name"], "minigit");
    let names: Vec<&str> = schema["sub-commands"]
        .as_array()
        .expect("sub-commands array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(
        names,
        ["commit", "checkout", "add", "serve", "completion", "schema"]
    );
}

#[test]
fn dotenv_file_supplies_flag_fallbacks() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join(".env"), "PORT=5050\n").expect("write .env");

    let out = minigit()
        .arg("serve")
        .current_dir(dir.path())
        .output()
        .expect("failed to run minigit serve");
    assert_success(&out, "minigit serve with .env");
    assert!(stdout(&out).contains("http://127.0.0.1:5050"), "{}", stdout(&out));
}
