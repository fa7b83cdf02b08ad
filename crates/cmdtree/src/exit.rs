//! Mapping errors to process exit codes.

use std::ffi::OsString;
use std::process::ExitStatus;

use thiserror::Error;

use crate::command::CommandBuilder;
use crate::error::{Error, ParseError};

/// Return this from a handler to exit with a specific status code.
///
/// ```rust,ignore
/// .handler(|_| Err(cmdtree::ExitError::new(3).into()))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("exit status {code}")]
pub struct ExitError {
    code: i32,
}

impl ExitError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    /// The status of a finished subprocess. Processes killed by a signal
    /// report 1.
    pub fn from_status(status: ExitStatus) -> Self {
        Self::new(status.code().unwrap_or(1))
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

/// The exit code for a failed run: an [`ExitError`] anywhere in a handler's
/// error chain selects its code, everything else is 1.
pub fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Handler(err) => err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ExitError>())
            .map_or(1, ExitError::code),
        _ => 1,
    }
}

/// Print `err` to stderr and exit with its code.
pub fn exit_with_error(err: &Error) -> ! {
    match err {
        Error::Handler(inner) => eprintln!("{inner:#}"),
        other => eprintln!("{other}"),
    }
    std::process::exit(exit_code(err))
}

/// Convert raw process arguments, rejecting the first one that is not UTF-8.
/// Positions are 1-based and count from the first token after the program
/// name.
pub fn utf8_args<I>(args: I) -> Result<Vec<String>, ParseError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            arg.into_string().map_err(|raw| ParseError::InvalidUtf8 {
                position: i + 1,
                lossy: raw.to_string_lossy().into_owned(),
            })
        })
        .collect()
}

/// Build the tree and run it against the process arguments, exiting on
/// failure.
pub fn run_main(builder: CommandBuilder) {
    let mut tree = match builder.build() {
        Ok(tree) => tree,
        Err(err) => exit_with_error(&err.into()),
    };
    let tokens = match utf8_args(std::env::args_os().skip(1)) {
        Ok(tokens) => tokens,
        Err(err) => exit_with_error(&err.into()),
    };
    if let Err(err) = tree.run(tokens) {
        exit_with_error(&err);
    }
}
