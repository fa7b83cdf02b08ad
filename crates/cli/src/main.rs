use std::process::Command as Process;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use cmdtree::{
    CommandBuilder, Context, ExitError, Value, ValueParser, arg, command, flag, help_flag, version_flag,
};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type LogHandle = reload::Handle<EnvFilter, Registry>;

fn main() {
    dotenvy::dotenv().ok();
    let log = init_tracing();
    cmdtree::run_main(cli(&log));
}

fn cli(log: &LogHandle) -> CommandBuilder {
    command("minigit", "a tiny git-flavoured command line")
        .version(env!("CARGO_PKG_VERSION"))
        .enable_completion()
        .flag(help_flag().short('h').inherited())
        .flag(version_flag().short('V'))
        .flag(flag("verbose", "Log debug output.").short('v').default(false).inherited())
        .flag(
            flag("git-dir", "Path to the repository.")
                .default(".git")
                .env("GIT_DIR")
                .inherited(),
        )
        .sub_command(
            command("commit", "Record changes to the repository.")
                .alias("ci")
                .flag(flag("message", "Commit message.").alias("msg").short('m'))
                .flag(flag("all", "Stage every modified file first.").short('a').default(false))
                .handler(verbose(log, commit)),
        )
        .sub_command(
            command("checkout", "Switch branches or restore files.")
                .alias("co")
                .flag(flag("create", "Create the branch first.").short('b').default(false))
                .arg(arg("branch", "Branch to switch to."))
                .handler(verbose(log, checkout)),
        )
        .sub_command(
            command("add", "Add file contents to the index.")
                .arg(arg("paths", "Files to add.").variadic())
                .handler(verbose(log, add)),
        )
        .sub_command(
            command("serve", "Serve the repository over HTTP.")
                .flag(
                    flag("port", "Port to listen on.")
                        .short('p')
                        .default(3000u16)
                        .env("PORT"),
                )
                .flag(flag("host", "Address to bind.").default("127.0.0.1"))
                .flag(flag("timeout", "Idle timeout.").default(Duration::from_secs(30)))
                .handler(verbose(log, serve)),
        )
        .sub_command(
            command("completion", "Shell completion scripts.")
                .sub_command(
                    command("bash", "Print the bash completion script.").handler(|ctx| {
                        print!("{}", ctx.tree().bash_completion_script());
                        Ok(())
                    }),
                )
                .sub_command(
                    command("zsh", "Print the zsh completion script.").handler(|ctx| {
                        print!("{}", ctx.tree().zsh_completion_script());
                        Ok(())
                    }),
                )
                .sub_command(
                    command("install", "Install the zsh completion script.")
                        .handler(verbose(log, install_completion)),
                ),
        )
        .sub_command(
            command("schema", "Print the command tree as JSON.").handler(|ctx| {
                println!("{}", ctx.tree().schema_json()?);
                Ok(())
            }),
        )
        .sub_command(
            command("exec", "Run a program and exit with its status.")
                .hidden()
                .handler(verbose(log, exec)),
        )
        .sub_command(
            command("fail", "Exit with the given status.")
                .hidden()
                .arg(arg("code", "Exit status.").parser(ValueParser::i32()))
                .handler(|ctx| Err(ExitError::new(ctx.arg("code")?).into())),
        )
}

/// Raise the log level to debug when `--verbose` is set, then run `handler`.
fn verbose<F>(log: &LogHandle, handler: F) -> impl Fn(&Context<'_>) -> Result<()> + Send + Sync + 'static
where
    F: Fn(&Context<'_>) -> Result<()> + Send + Sync + 'static,
{
    let log = log.clone();
    move |ctx: &Context<'_>| {
        if ctx.flag::<bool>("verbose")? {
            log.modify(|filter| *filter = EnvFilter::new("debug"))
                .context("raising log level")?;
        }
        tracing::debug!(command = %ctx.qualified_name(), "executing command");
        handler(ctx)
    }
}

fn commit(ctx: &Context<'_>) -> Result<()> {
    let message: String = ctx.flag("message")?;
    if message.trim().is_empty() {
        bail!("aborting commit due to empty commit message");
    }
    let git_dir: String = ctx.flag("git-dir")?;
    if ctx.flag::<bool>("all")? {
        println!("staged all modified files in {git_dir}");
    }
    println!("[{git_dir}] {message}");
    Ok(())
}

fn checkout(ctx: &Context<'_>) -> Result<()> {
    let branch: String = ctx.arg("branch")?;
    if ctx.flag::<bool>("create")? {
        println!("Switched to a new branch '{branch}'");
    } else {
        println!("Switched to branch '{branch}'");
    }
    for path in ctx.rest() {
        println!("restored '{path}'");
    }
    Ok(())
}

fn add(ctx: &Context<'_>) -> Result<()> {
    let paths: Vec<String> = ctx.variadic_arg("paths")?;
    if paths.is_empty() {
        println!("Nothing specified, nothing added.");
    }
    for path in paths {
        println!("add '{path}'");
    }
    Ok(())
}

fn serve(ctx: &Context<'_>) -> Result<()> {
    let port: u16 = ctx.flag("port")?;
    let host: String = ctx.flag("host")?;
    let timeout: Duration = ctx.flag("timeout")?;
    let git_dir: String = ctx.flag("git-dir")?;
    println!(
        "serving {git_dir} on http://{host}:{port} (idle timeout {})",
        Value::from(timeout)
    );
    Ok(())
}

fn install_completion(ctx: &Context<'_>) -> Result<()> {
    match ctx.tree().install_zsh_completion()? {
        Some(path) => println!("completion script installed at {}", path.display()),
        None => println!("zsh not found, nothing installed"),
    }
    Ok(())
}

fn exec(ctx: &Context<'_>) -> Result<()> {
    let Some((program, args)) = ctx.rest().split_first() else {
        bail!("usage: minigit exec -- <program> [args...]");
    };
    let status = Process::new(program)
        .args(args)
        .status()
        .with_context(|| format!("running {program}"))?;
    if !status.success() {
        return Err(ExitError::from_status(status).into());
    }
    Ok(())
}

fn init_tracing() -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
    handle
}
