//! Bound values and typed retrieval.
//!
//! Every flag and argument stores its parsed value as a [`Value`]. Handlers read
//! values back through [`FromValue`], which checks the variant instead of
//! casting.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use url::Url;

/// The semantic type of a [`Value`] or [`crate::ValueParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Bool,
    Int,
    Float,
    Duration,
    Timestamp,
    Url,
    List,
    Custom,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Duration => "duration",
            Self::Timestamp => "timestamp",
            Self::Url => "url",
            Self::List => "list",
            Self::Custom => "custom",
        }
    }

    /// The implicit default of a flag of this kind, where one exists.
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(String::new())),
            Self::Bool => Some(Value::Bool(false)),
            Self::Int => Some(Value::Int(0)),
            Self::Float => Some(Value::Float(0.0)),
            Self::Duration => Some(Value::Duration(Duration::ZERO)),
            Self::List => Some(Value::List(Vec::new())),
            Self::Timestamp | Self::Url | Self::Custom => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value produced by a custom parser.
///
/// The rendered form is captured at construction so help output does not need
/// to know the concrete type.
#[derive(Clone)]
pub struct CustomValue {
    type_name: &'static str,
    display: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        Self {
            type_name: short_type_name::<T>(),
            display: value.to_string(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type_name", &self.type_name)
            .field("display", &self.display)
            .finish()
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.type_name == other.type_name && self.display == other.display)
    }
}

/// A parsed flag or argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Duration(Duration),
    Timestamp(DateTime<FixedOffset>),
    Url(Url),
    List(Vec<Value>),
    Custom(CustomValue),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Duration(_) => ValueKind::Duration,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Url(_) => ValueKind::Url,
            Self::List(_) => ValueKind::List,
            Self::Custom(_) => ValueKind::Custom,
        }
    }

    /// Name used in help output and type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Custom(custom) => custom.type_name(),
            other => other.kind().as_str(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
            Self::Timestamp(t) => f.write_str(&t.to_rfc3339()),
            Self::Url(u) => f.write_str(u.as_str()),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Url> for Value {
    fn from(value: Url) -> Self {
        Self::Url(value)
    }
}

impl From<CustomValue> for Value {
    fn from(value: CustomValue) -> Self {
        Self::Custom(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

/// Typed extraction from a [`Value`].
///
/// `from_value` returns `None` when the variant does not match; accessors turn
/// that into [`crate::LookupError::TypeMismatch`].
pub trait FromValue: Sized {
    fn type_name() -> &'static str;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn type_name() -> &'static str {
        "value"
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_from_value!(i64, i32, u16, u32);

impl FromValue for f64 {
    fn type_name() -> &'static str {
        "float"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for Duration {
    fn type_name() -> &'static str {
        "duration"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn type_name() -> &'static str {
        "timestamp"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromValue for Url {
    fn type_name() -> &'static str {
        "url"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Url(u) => Some(u.clone()),
            _ => None,
        }
    }
}

/// Wrapper for reading values produced by [`crate::ValueParser::custom`].
///
/// ```rust,ignore
/// let Custom(level) = ctx.flag::<Custom<Level>>("level")?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Custom<T>(pub T);

impl<T: Any + Clone> FromValue for Custom<T> {
    fn type_name() -> &'static str {
        short_type_name::<T>()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Custom(custom) => custom.downcast_ref::<T>().cloned().map(Custom),
            _ => None,
        }
    }
}

/// `std::any::type_name` without the module path (`my_crate::Level` -> `Level`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    if full.contains('<') {
        return full;
    }
    match full.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
