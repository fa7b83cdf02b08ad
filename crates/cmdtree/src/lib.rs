//! Declarative command trees for command-line programs.
//!
//! Describe commands, flags and positional arguments with builders, then hand
//! the process arguments to [`CommandTree::run`]. The parser binds values,
//! checks required arguments and calls the handler of the selected command
//! with a [`Context`] for typed access.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmdtree::{arg, command, flag, help_flag};
//!
//! fn main() {
//!     cmdtree::run_main(
//!         command("greet", "Print a greeting")
//!             .version(env!("CARGO_PKG_VERSION"))
//!             .flag(help_flag().short('h').inherited())
//!             .flag(flag("shout", "Use capitals").short('s').default(false))
//!             .arg(arg("name", "Who to greet").default("world"))
//!             .handler(|ctx| {
//!                 let name: String = ctx.arg("name")?;
//!                 let greeting = format!("hello, {name}");
//!                 if ctx.flag::<bool>("shout")? {
//!                     println!("{}", greeting.to_uppercase());
//!                 } else {
//!                     println!("{greeting}");
//!                 }
//!                 Ok(())
//!             }),
//!     );
//! }
//! ```
//!
//! Supported input forms: `--name value`, `--name=value`, `--bool`,
//! `-x value`, `-x=value`, `-abc`, `-ab value` and the `--` terminator, after
//! which every token is collected verbatim into [`Context::rest`].

mod argument;
mod command;
mod completion;
mod context;
mod error;
mod exit;
mod flag;
mod help;
mod parse;
mod run;
mod schema;
mod validate;
mod value;
mod value_parser;

pub use argument::{Argument, ArgumentBuilder, arg};
pub use command::{Command, CommandBuilder, CommandId, CommandTree, Handler, command};
pub use completion::{COMPLETE_COMMAND, CompletionResult};
pub use context::{Cancellation, Context, Env};
pub use error::{BuildError, Error, LookupError, ParseError, Violation};
pub use exit::{ExitError, exit_code, exit_with_error, run_main, utf8_args};
pub use flag::{Flag, FlagBuilder, flag, help_flag, version_flag};
pub use parse::{Action, Parsed};
pub use schema::{ArgumentSchema, CommandSchema, FlagSchema};
pub use value::{Custom, CustomValue, FromValue, Value, ValueKind};
pub use value_parser::{
    Parseable, UnsupportedTypeError, ValueParseError, ValueParser, ValueParserRegistry,
};
