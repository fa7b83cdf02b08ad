//! String-to-value parsers and the registry that maps type tags to them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use thiserror::Error;
use url::Url;

use crate::value::{CustomValue, Value, ValueKind, short_type_name};

/// A value failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing {raw:?} as {type_name}: {message}")]
pub struct ValueParseError {
    raw: String,
    type_name: &'static str,
    message: String,
}

impl ValueParseError {
    pub fn new(raw: impl Into<String>, type_name: &'static str, message: impl fmt::Display) -> Self {
        Self {
            raw: raw.into(),
            type_name,
            message: message.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// No parser is registered for a type tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported type {tag:?}: no value parser registered")]
pub struct UnsupportedTypeError {
    tag: String,
}

impl UnsupportedTypeError {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

type ParseFn = dyn Fn(&str) -> Result<Value, ValueParseError> + Send + Sync;

/// A tagged parsing function.
///
/// The [`ValueKind`] tag decides flag semantics: only parsers built with
/// [`ValueParser::bool`] make a flag boolean. A custom parser that happens to
/// produce a bool is still `ValueKind::Custom`.
#[derive(Clone)]
pub struct ValueParser {
    kind: ValueKind,
    type_name: &'static str,
    parse: Arc<ParseFn>,
}

impl fmt::Debug for ValueParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueParser")
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl ValueParser {
    fn new<F>(kind: ValueKind, type_name: &'static str, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Value, ValueParseError> + Send + Sync + 'static,
    {
        Self {
            kind,
            type_name,
            parse: Arc::new(parse),
        }
    }

    pub fn string() -> Self {
        Self::new(ValueKind::String, "string", |raw| Ok(Value::String(raw.to_string())))
    }

    /// Accepts `1 t T TRUE true True 0 f F FALSE false False`.
    pub fn bool() -> Self {
        Self::new(ValueKind::Bool, "bool", |raw| match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(Value::Bool(true)),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(Value::Bool(false)),
            _ => Err(ValueParseError::new(raw, "bool", "invalid syntax")),
        })
    }

    pub fn int() -> Self {
        Self::new(ValueKind::Int, "int", |raw| {
            raw.parse::<i64>()
                .map(Value::Int)
                .map_err(|e| ValueParseError::new(raw, "int", e))
        })
    }

    pub fn i32() -> Self {
        Self::new(ValueKind::Int, "i32", |raw| {
            raw.parse::<i32>()
                .map(Value::from)
                .map_err(|e| ValueParseError::new(raw, "i32", e))
        })
    }

    pub fn u16() -> Self {
        Self::new(ValueKind::Int, "u16", |raw| {
            raw.parse::<u16>()
                .map(Value::from)
                .map_err(|e| ValueParseError::new(raw, "u16", e))
        })
    }

    pub fn u32() -> Self {
        Self::new(ValueKind::Int, "u32", |raw| {
            raw.parse::<u32>()
                .map(Value::from)
                .map_err(|e| ValueParseError::new(raw, "u32", e))
        })
    }

    pub fn float() -> Self {
        Self::new(ValueKind::Float, "float", |raw| {
            raw.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ValueParseError::new(raw, "float", e))
        })
    }

    /// Human-friendly durations such as `250ms`, `1h 30m` or `2days`.
    pub fn duration() -> Self {
        Self::new(ValueKind::Duration, "duration", |raw| {
            humantime::parse_duration(raw)
                .map(Value::Duration)
                .map_err(|e| ValueParseError::new(raw, "duration", e))
        })
    }

    /// RFC 3339 timestamps, e.g. `2024-05-01T12:00:00Z`.
    pub fn timestamp() -> Self {
        Self::new(ValueKind::Timestamp, "timestamp", |raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(Value::Timestamp)
                .map_err(|e| ValueParseError::new(raw, "timestamp", e))
        })
    }

    /// Timestamps in a `chrono` format string. The format must include an offset.
    pub fn timestamp_with_format(format: impl Into<String>) -> Self {
        let format = format.into();
        Self::new(ValueKind::Timestamp, "timestamp", move |raw| {
            DateTime::parse_from_str(raw, &format)
                .map(Value::Timestamp)
                .map_err(|e| ValueParseError::new(raw, "timestamp", e))
        })
    }

    pub fn url() -> Self {
        Self::new(ValueKind::Url, "url", |raw| {
            Url::parse(raw)
                .map(Value::Url)
                .map_err(|e| ValueParseError::new(raw, "url", e))
        })
    }

    /// Wrap a user-supplied parsing function.
    ///
    /// Values are stored as [`CustomValue`] and read back with
    /// [`crate::Custom`].
    pub fn custom<T, E, F>(parse: F) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
        E: fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let type_name = short_type_name::<T>();
        Self::new(ValueKind::Custom, type_name, move |raw| {
            parse(raw)
                .map(|v| Value::Custom(CustomValue::new(v)))
                .map_err(|e| ValueParseError::new(raw, type_name, e))
        })
    }

    /// Look up a built-in parser by tag (`"int"`, `"url"`, ...).
    pub fn for_tag(tag: &str) -> Result<Self, UnsupportedTypeError> {
        ValueParserRegistry::builtin().get(tag)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_bool(&self) -> bool {
        self.kind == ValueKind::Bool
    }

    pub fn parse(&self, raw: &str) -> Result<Value, ValueParseError> {
        (self.parse)(raw)
    }
}

/// Maps type tags to parsers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ValueParserRegistry {
    parsers: IndexMap<String, ValueParser>,
}

impl ValueParserRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in parser.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("string", ValueParser::string())
            .register("bool", ValueParser::bool())
            .register("int", ValueParser::int())
            .register("i32", ValueParser::i32())
            .register("u16", ValueParser::u16())
            .register("u32", ValueParser::u32())
            .register("float", ValueParser::float())
            .register("duration", ValueParser::duration())
            .register("timestamp", ValueParser::timestamp())
            .register("url", ValueParser::url());
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, parser: ValueParser) -> &mut Self {
        self.parsers.insert(tag.into(), parser);
        self
    }

    pub fn get(&self, tag: &str) -> Result<ValueParser, UnsupportedTypeError> {
        self.parsers
            .get(tag)
            .cloned()
            .ok_or_else(|| UnsupportedTypeError {
                tag: tag.to_string(),
            })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.parsers.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }
}

/// Rust types with a built-in parser, used to infer a parser from a default.
pub trait Parseable: Into<Value> {
    fn value_parser() -> ValueParser;
}

impl Parseable for String {
    fn value_parser() -> ValueParser {
        ValueParser::string()
    }
}

impl Parseable for &str {
    fn value_parser() -> ValueParser {
        ValueParser::string()
    }
}

impl Parseable for bool {
    fn value_parser() -> ValueParser {
        ValueParser::bool()
    }
}

impl Parseable for i64 {
    fn value_parser() -> ValueParser {
        ValueParser::int()
    }
}

impl Parseable for i32 {
    fn value_parser() -> ValueParser {
        ValueParser::i32()
    }
}

impl Parseable for u16 {
    fn value_parser() -> ValueParser {
        ValueParser::u16()
    }
}

impl Parseable for u32 {
    fn value_parser() -> ValueParser {
        ValueParser::u32()
    }
}

impl Parseable for f64 {
    fn value_parser() -> ValueParser {
        ValueParser::float()
    }
}

impl Parseable for Duration {
    fn value_parser() -> ValueParser {
        ValueParser::duration()
    }
}

impl Parseable for DateTime<FixedOffset> {
    fn value_parser() -> ValueParser {
        ValueParser::timestamp()
    }
}

impl Parseable for Url {
    fn value_parser() -> ValueParser {
        ValueParser::url()
    }
}
