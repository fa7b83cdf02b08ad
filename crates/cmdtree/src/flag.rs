use crate::error::Violation;
use crate::value::Value;
use crate::value_parser::{Parseable, ValueParser};

pub(crate) const HELP_FLAG_NAME: &str = "help";
pub(crate) const VERSION_FLAG_NAME: &str = "version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FlagRole {
    #[default]
    Plain,
    Help,
    Version,
}

/// A named option of a command.
#[derive(Debug, Clone)]
pub struct Flag {
    name: String,
    description: String,
    aliases: Vec<String>,
    shorts: Vec<char>,
    parser: ValueParser,
    default: Value,
    env: Option<String>,
    hidden: bool,
    inherited: bool,
    role: FlagRole,

    pub(crate) value: Option<Value>,
}

impl Flag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn shorts(&self) -> &[char] {
        &self.shorts
    }

    pub fn parser(&self) -> &ValueParser {
        &self.parser
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Environment variable consulted when the flag is absent from argv.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    /// Boolean flags never take a value from the next token.
    pub fn is_bool(&self) -> bool {
        self.parser.is_bool()
    }

    pub fn is_help(&self) -> bool {
        self.is_bool() && (self.role == FlagRole::Help || self.name == HELP_FLAG_NAME)
    }

    pub fn is_version(&self) -> bool {
        self.is_bool() && self.role == FlagRole::Version
    }

    /// The value bound by the last parse, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Whether a boolean flag currently evaluates to `true`.
    pub(crate) fn is_asserted(&self) -> bool {
        matches!(self.value, Some(Value::Bool(true)))
    }

    /// The value presence assigns to a boolean flag: the negated default.
    pub(crate) fn toggled(&self) -> Value {
        Value::Bool(!matches!(self.default, Value::Bool(true)))
    }

    /// Name, aliases, in declaration order.
    pub(crate) fn longs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub(crate) fn matches_long(&self, long: &str) -> bool {
        self.longs().any(|l| l == long)
    }
}

pub(crate) fn dashify_short(short: char) -> String {
    format!("-{short}")
}

/// Builder for [`Flag`].
///
/// Flags parse as strings defaulting to `""` until a default or parser says
/// otherwise.
///
/// ```rust,ignore
/// cmdtree::flag("port", "Port to listen on")
///     .alias("addr")
///     .short('p')
///     .default(3000)
///     .env("PORT")
/// ```
#[derive(Debug, Clone)]
pub struct FlagBuilder {
    name: String,
    description: String,
    aliases: Vec<String>,
    shorts: Vec<char>,
    parser: ValueParser,
    default: Value,
    env: Option<String>,
    hidden: bool,
    inherited: bool,
    role: FlagRole,
    explicit_default: bool,
    failure: Option<Violation>,
}

/// Start describing a flag.
pub fn flag(name: impl Into<String>, description: impl Into<String>) -> FlagBuilder {
    FlagBuilder {
        name: name.into(),
        description: description.into(),
        aliases: Vec::new(),
        shorts: Vec::new(),
        parser: ValueParser::string(),
        default: Value::String(String::new()),
        env: None,
        hidden: false,
        inherited: false,
        role: FlagRole::Plain,
        explicit_default: false,
        failure: None,
    }
}

/// `--help`: when asserted, the command prints its help instead of running.
pub fn help_flag() -> FlagBuilder {
    let mut builder = flag(HELP_FLAG_NAME, "Print help.").default(false);
    builder.role = FlagRole::Help;
    builder
}

/// `--version`: when asserted, the command prints its inherited version.
pub fn version_flag() -> FlagBuilder {
    let mut builder = flag(VERSION_FLAG_NAME, "Print version.").default(false);
    builder.role = FlagRole::Version;
    builder
}

impl FlagBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.shorts.push(short);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Make the flag visible to every descendant command.
    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// Set the default. The parser follows the default's type, so
    /// `default(false)` makes a boolean flag.
    pub fn default<T: Parseable>(mut self, value: T) -> Self {
        self.parser = T::value_parser();
        self.default = value.into();
        self.explicit_default = true;
        self
    }

    pub fn default_with_parser(mut self, value: impl Into<Value>, parser: ValueParser) -> Self {
        self.parser = parser;
        self.default = value.into();
        self.explicit_default = true;
        self
    }

    /// Replace the parser. Without an explicit default the flag defaults to
    /// the zero value of the parser's kind, such as `0` or `false`. Kinds
    /// without one need [`FlagBuilder::default`].
    pub fn parser(mut self, parser: ValueParser) -> Self {
        self.set_parser(parser);
        self
    }

    /// Use the built-in parser registered under `tag`.
    pub fn value_type(mut self, tag: &str) -> Self {
        if self.failure.is_some() {
            return self;
        }
        match ValueParser::for_tag(tag) {
            Ok(parser) => self.set_parser(parser),
            Err(source) => {
                self.failure = Some(Violation::UnsupportedType {
                    kind: "flag",
                    name: self.name.clone(),
                    source,
                })
            }
        }
        self
    }

    /// Fall back to this environment variable before the default.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    fn set_parser(&mut self, parser: ValueParser) {
        if !self.explicit_default {
            if let Some(zero) = parser.kind().zero_value() {
                self.default = zero;
            }
        }
        self.parser = parser;
    }

    pub(crate) fn build(self) -> Result<Flag, Violation> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        Ok(Flag {
            name: self.name,
            description: self.description,
            aliases: self.aliases,
            shorts: self.shorts,
            parser: self.parser,
            default: self.default,
            env: self.env,
            hidden: self.hidden,
            inherited: self.inherited,
            role: self.role,
            value: None,
        })
    }
}
