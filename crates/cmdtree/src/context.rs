//! The handle passed to command handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::command::{Command, CommandId, CommandTree};
use crate::error::LookupError;
use crate::value::{FromValue, Value};

/// Where flag environment fallbacks are read from.
#[derive(Debug, Clone, Default)]
pub enum Env {
    /// `std::env::var`.
    #[default]
    Process,
    /// A fixed set of variables, for tests and embedding.
    Fixed(Vec<(String, String)>),
}

impl Env {
    pub fn fixed<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
        }
    }
}

/// Cooperative cancellation signal shared with handlers.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read access to the parsed command line for the command being run.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    tree: &'a CommandTree,
    command: CommandId,
    env: &'a Env,
    cancellation: &'a Cancellation,
}

impl<'a> Context<'a> {
    pub fn new(
        tree: &'a CommandTree,
        command: CommandId,
        env: &'a Env,
        cancellation: &'a Cancellation,
    ) -> Self {
        Self {
            tree,
            command,
            env,
            cancellation,
        }
    }

    /// Typed flag value. See [`Context::flag_value`].
    pub fn flag<T: FromValue>(&self, name: &str) -> Result<T, LookupError> {
        let value = self.flag_value(name)?;
        convert(name, &value)
    }

    /// The flag's bound value, else its environment variable when set, else
    /// its default. Any flag of the command or an ancestor can be read.
    pub fn flag_value(&self, name: &str) -> Result<Value, LookupError> {
        let flag = self
            .tree
            .find_flag(self.command, name)
            .ok_or_else(|| LookupError::FlagNotFound(name.to_string()))?;

        if let Some(value) = flag.value() {
            return Ok(value.clone());
        }

        if let Some(var) = flag.env() {
            if let Some(raw) = self.env.get(var) {
                tracing::trace!(flag = name, var, "flag value from environment");
                return flag.parser().parse(&raw).map_err(|source| LookupError::Env {
                    flag: name.to_string(),
                    var: var.to_string(),
                    source,
                });
            }
        }

        Ok(flag.default_value().clone())
    }

    pub fn arg<T: FromValue>(&self, name: &str) -> Result<T, LookupError> {
        let value = self.arg_value(name)?;
        convert(name, &value)
    }

    /// The argument's bound value, else its default. Unbound variadic
    /// arguments read as an empty list.
    pub fn arg_value(&self, name: &str) -> Result<Value, LookupError> {
        let argument = self
            .tree
            .find_argument(self.command, name)
            .ok_or_else(|| LookupError::ArgumentNotFound(name.to_string()))?;

        if let Some(value) = argument.value() {
            return Ok(value.clone());
        }
        if argument.is_variadic() {
            return Ok(Value::List(Vec::new()));
        }
        argument
            .default_value()
            .cloned()
            .ok_or_else(|| LookupError::ArgumentMissingValue(name.to_string()))
    }

    pub fn variadic_arg<T: FromValue>(&self, name: &str) -> Result<Vec<T>, LookupError> {
        let argument = self
            .tree
            .find_argument(self.command, name)
            .ok_or_else(|| LookupError::ArgumentNotFound(name.to_string()))?;
        if !argument.is_variadic() {
            return Err(LookupError::NotVariadic(name.to_string()));
        }

        match argument.value() {
            Some(Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| convert(&format!("{name}[{i}]"), item))
                .collect(),
            Some(other) => Err(LookupError::TypeMismatch {
                name: name.to_string(),
                expected: "list",
                actual: other.type_name(),
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Tokens after `--`.
    pub fn rest(&self) -> &'a [String] {
        self.tree.command(self.command).rest()
    }

    pub fn command(&self) -> &'a Command {
        self.tree.command(self.command)
    }

    pub fn command_id(&self) -> CommandId {
        self.command
    }

    pub fn command_name(&self) -> &'a str {
        self.command().name()
    }

    pub fn qualified_name(&self) -> String {
        self.tree.qualified_name(self.command)
    }

    pub fn version(&self) -> Option<&'a str> {
        self.tree.find_version(self.command)
    }

    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

fn convert<T: FromValue>(name: &str, value: &Value) -> Result<T, LookupError> {
    T::from_value(value).ok_or_else(|| LookupError::TypeMismatch {
        name: name.to_string(),
        expected: T::type_name(),
        actual: value.type_name(),
    })
}
