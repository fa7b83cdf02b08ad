use crate::error::Violation;
use crate::value::Value;
use crate::value_parser::{Parseable, ValueParser};

/// A positional argument of a command.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    description: String,
    parser: ValueParser,
    default: Option<Value>,
    variadic: bool,

    pub(crate) value: Option<Value>,
}

impl Argument {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parser(&self) -> &ValueParser {
        &self.parser
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Arguments without a default must be given, unless they are variadic.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.variadic
    }

    /// The value bound by the last parse, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// `<name>`, `[<name>]` or `[<name>...]`.
    pub fn in_brackets(&self) -> String {
        if self.variadic {
            format!("[<{}>...]", self.name)
        } else if self.is_required() {
            format!("<{}>", self.name)
        } else {
            format!("[<{}>]", self.name)
        }
    }
}

/// Builder for [`Argument`].
///
/// ```rust,ignore
/// cmdtree::arg("numbers", "Numbers to sum")
///     .parser(cmdtree::ValueParser::int())
///     .variadic()
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentBuilder {
    name: String,
    description: String,
    parser: ValueParser,
    default: Option<Value>,
    variadic: bool,
    failure: Option<Violation>,
}

/// Start describing a positional argument. Arguments parse as strings unless
/// configured otherwise.
pub fn arg(name: impl Into<String>, description: impl Into<String>) -> ArgumentBuilder {
    ArgumentBuilder {
        name: name.into(),
        description: description.into(),
        parser: ValueParser::string(),
        default: None,
        variadic: false,
        failure: None,
    }
}

impl ArgumentBuilder {
    pub fn parser(mut self, parser: ValueParser) -> Self {
        self.parser = parser;
        self
    }

    /// Use the built-in parser registered under `tag`.
    pub fn value_type(mut self, tag: &str) -> Self {
        if self.failure.is_some() {
            return self;
        }
        match ValueParser::for_tag(tag) {
            Ok(parser) => self.parser = parser,
            Err(source) => {
                self.failure = Some(Violation::UnsupportedType {
                    kind: "argument",
                    name: self.name.clone(),
                    source,
                })
            }
        }
        self
    }

    /// Make the argument optional. The parser follows the default's type.
    pub fn default<T: Parseable>(mut self, value: T) -> Self {
        self.parser = T::value_parser();
        self.default = Some(value.into());
        self
    }

    pub fn default_with_parser(mut self, value: impl Into<Value>, parser: ValueParser) -> Self {
        self.parser = parser;
        self.default = Some(value.into());
        self
    }

    /// Collect every remaining token. Only the last argument may be variadic.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub(crate) fn build(self) -> Result<Argument, Violation> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        Ok(Argument {
            name: self.name,
            description: self.description,
            parser: self.parser,
            default: self.default,
            variadic: self.variadic,
            value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn required_follows_default_and_variadic() {
        let required = arg("branch", "Branch").build().unwrap();
        assert!(required.is_required());
        assert_eq!(required.in_brackets(), "<branch>");

        let optional = arg("dir", "Directory").default(".").build().unwrap();
        assert!(!optional.is_required());
        assert_eq!(optional.in_brackets(), "[<dir>]");

        let variadic = arg("files", "Files").variadic().build().unwrap();
        assert!(!variadic.is_required());
        assert_eq!(variadic.in_brackets(), "[<files>...]");
    }

    #[test]
    fn default_selects_parser() {
        let a = arg("count", "Count").default(3i64).build().unwrap();
        assert_eq!(a.parser().kind(), ValueKind::Int);
        assert_eq!(a.default_value(), Some(&Value::Int(3)));
    }

    #[test]
    fn unknown_value_type_fails_the_build() {
        let err = arg("addr", "Address")
            .value_type("socket")
            .value_type("int")
            .build()
            .unwrap_err();
        assert!(matches!(err, Violation::UnsupportedType { kind: "argument", .. }));
        assert!(err.to_string().contains("\"socket\""));
    }
}
