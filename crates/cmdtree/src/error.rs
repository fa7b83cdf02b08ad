use std::io;

use thiserror::Error;

use crate::value::ValueKind;
use crate::value_parser::{UnsupportedTypeError, ValueParseError};

/// A single structural problem found while building a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("duplicate flag {0:?}")]
    DuplicateFlag(String),

    #[error("duplicate short flag \"-{0}\"")]
    DuplicateShort(char),

    #[error("duplicate argument {0:?}")]
    DuplicateArgument(String),

    #[error("duplicate sub-command {0:?}")]
    DuplicateSubCommand(String),

    #[error("cannot have both sub-commands and arguments")]
    SubCommandsAndArguments,

    #[error(
        "only the last argument can be variadic, but argument {name:?} at position {position} is variadic"
    )]
    VariadicNotLast { name: String, position: usize },

    #[error("variadic argument {0:?} cannot have a default value")]
    VariadicWithDefault(String),

    #[error("{kind} name {name:?} must be a single token")]
    NameNotSingleToken { kind: &'static str, name: String },

    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    #[error("{kind} {name:?} parses {expected} values but defaults to a {actual}")]
    DefaultTypeMismatch {
        kind: &'static str,
        name: String,
        expected: ValueKind,
        actual: &'static str,
    },

    #[error("{kind} {name:?}: {source}")]
    UnsupportedType {
        kind: &'static str,
        name: String,
        #[source]
        source: UnsupportedTypeError,
    },

    #[error(transparent)]
    SubCommand(Box<BuildError>),
}

/// A command tree could not be built.
///
/// All violations of a command are reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid command {command:?}: {}", join_violations(.violations))]
pub struct BuildError {
    command: String,
    violations: Vec<Violation>,
}

impl BuildError {
    pub(crate) fn new(command: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            command: command.into(),
            violations,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Malformed command-line input. The first error aborts the parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid flag: no flag found for {flag:?}")]
    InvalidFlag { flag: String },

    #[error("missing flag value: flag {flag:?}")]
    MissingFlagValue { flag: String },

    #[error("too many arguments: only expected {expected}, got {token:?}")]
    TooManyArguments { expected: usize, token: String },

    #[error("short flags with equal signs cannot be grouped: {token:?}")]
    FlagGroupWithEqual { token: String },

    #[error("short flag group {token:?} has more than one flag taking a value ({first} and {second})")]
    GroupValueConflict {
        token: String,
        first: String,
        second: String,
    },

    #[error("parsing provided value {raw:?} for {target}: {source}")]
    InvalidValue {
        target: String,
        raw: String,
        #[source]
        source: ValueParseError,
    },

    #[error("argument missing value: {}", quote_list(.names))]
    ArgumentMissingValue { names: Vec<String> },

    #[error("command-line token {position} is not valid UTF-8: {lossy:?}")]
    InvalidUtf8 { position: usize, lossy: String },
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("{n:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// An accessor could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("flag not found: {0:?}")]
    FlagNotFound(String),

    #[error("argument not found: {0:?}")]
    ArgumentNotFound(String),

    #[error("argument {0:?} is not variadic")]
    NotVariadic(String),

    #[error("argument missing value: {0:?}")]
    ArgumentMissingValue(String),

    #[error("{name:?} holds a {actual} value, not {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("flag {flag:?} from ${var}: {source}")]
    Env {
        flag: String,
        var: String,
        #[source]
        source: ValueParseError,
    },
}

/// Everything [`crate::CommandTree::run`] can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Handler(anyhow::Error),

    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}
