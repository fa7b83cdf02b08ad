//! The token walker.
//!
//! Parsing starts at the root and moves down the tree: a token naming a
//! sub-command hands every later token to that command. Within one command
//! tokens are, in order of precedence, the `--` terminator, flags,
//! sub-command names and positional arguments.

use crate::command::{CommandId, CommandTree, FlagRef};
use crate::error::ParseError;
use crate::flag::dashify_short;
use crate::validate;
use crate::value::Value;

const TERMINATOR: &str = "--";

/// What [`CommandTree::parse`] decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the resolved handler.
    Run,
    /// Print help for the command.
    Help,
    /// Print the inherited version.
    Version,
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed {
    pub command: CommandId,
    pub action: Action,
}

impl CommandTree {
    /// Bind `tokens` (without the program name) onto the tree.
    ///
    /// Values bound by an earlier parse are cleared first.
    pub fn parse<I, S>(&mut self, tokens: I) -> Result<Parsed, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        self.reset();

        let command = Parser::new(self, &tokens).run()?;
        let action = self.resolve_action(command);
        if action == Action::Run {
            validate::validate_input(self, command)?;
        }

        let action = match action {
            Action::Run if self.resolve_handler(command).is_none() => Action::Help,
            other => other,
        };
        tracing::debug!(
            command = %self.qualified_name(command),
            ?action,
            "parsed command line"
        );
        Ok(Parsed { command, action })
    }

    /// Help and version follow the final values of their flags on the
    /// command and its ancestors.
    fn resolve_action(&self, id: CommandId) -> Action {
        let asserted = |pick: fn(&crate::Flag) -> bool| {
            self.ancestors(id).any(|a| {
                self.command(a)
                    .flags()
                    .iter()
                    .any(|f| pick(f) && f.is_asserted())
            })
        };
        if asserted(crate::Flag::is_help) {
            Action::Help
        } else if asserted(crate::Flag::is_version) {
            Action::Version
        } else {
            Action::Run
        }
    }
}

enum Step {
    Continue,
    Transfer(CommandId),
    Done,
}

struct Parser<'t> {
    tree: &'t mut CommandTree,
    tokens: &'t [String],
    command: CommandId,
    index: usize,
    argument_index: usize,
}

impl<'t> Parser<'t> {
    fn new(tree: &'t mut CommandTree, tokens: &'t [String]) -> Self {
        Self {
            tree,
            tokens,
            command: CommandId::ROOT,
            index: 0,
            argument_index: 0,
        }
    }

    fn run(mut self) -> Result<CommandId, ParseError> {
        while self.index < self.tokens.len() {
            match self.step()? {
                Step::Continue => {}
                Step::Transfer(child) => {
                    tracing::debug!(
                        command = %self.tree.qualified_name(child),
                        "entering sub-command"
                    );
                    self.command = child;
                    self.argument_index = 0;
                    self.index += 1;
                }
                Step::Done => break,
            }
        }
        Ok(self.command)
    }

    fn step(&mut self) -> Result<Step, ParseError> {
        let tokens = self.tokens;
        let token = tokens[self.index].as_str();

        if token == TERMINATOR {
            let rest = tokens[self.index + 1..].to_vec();
            tracing::trace!(count = rest.len(), "terminator reached");
            self.tree.command_mut(self.command).rest = rest;
            return Ok(Step::Done);
        }

        if let Some(long) = token.strip_prefix("--") {
            self.parse_long(long)?;
            return Ok(Step::Continue);
        }

        if let Some(group) = token.strip_prefix('-').filter(|g| !g.is_empty()) {
            self.parse_short_group(token, group)?;
            return Ok(Step::Continue);
        }

        if let Some(child) = self.tree.sub_command_matching(self.command, token) {
            return Ok(Step::Transfer(child));
        }

        self.parse_positional(token)?;
        Ok(Step::Continue)
    }

    fn parse_long(&mut self, body: &str) -> Result<(), ParseError> {
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let display = format!("--{name}");
        let at = self
            .tree
            .find_long_flag(self.command, name)
            .ok_or_else(|| ParseError::InvalidFlag {
                flag: display.clone(),
            })?;

        match inline {
            Some(raw) => {
                self.bind_raw(at, &display, raw)?;
                self.index += 1;
            }
            None if self.tree.flag_at(at).is_bool() => {
                self.toggle(at);
                self.index += 1;
            }
            None => {
                let raw = self.value_token(&display)?;
                self.bind_raw(at, &display, raw)?;
                self.index += 2;
            }
        }
        Ok(())
    }

    fn parse_short_group(&mut self, token: &str, group: &str) -> Result<(), ParseError> {
        if let Some((shorts, raw)) = group.split_once('=') {
            let mut chars = shorts.chars();
            let (Some(short), None) = (chars.next(), chars.next()) else {
                return Err(ParseError::FlagGroupWithEqual {
                    token: token.to_string(),
                });
            };
            let at = self.resolve_short(short)?;
            self.bind_raw(at, &dashify_short(short), raw)?;
            self.index += 1;
            return Ok(());
        }

        let mut takes_value: Option<(FlagRef, char)> = None;
        for short in group.chars() {
            let at = self.resolve_short(short)?;
            if self.tree.flag_at(at).is_bool() {
                self.toggle(at);
                continue;
            }
            if let Some((_, first)) = takes_value {
                return Err(ParseError::GroupValueConflict {
                    token: token.to_string(),
                    first: dashify_short(first),
                    second: dashify_short(short),
                });
            }
            takes_value = Some((at, short));
        }

        match takes_value {
            Some((at, short)) => {
                let display = dashify_short(short);
                let raw = self.value_token(&display)?;
                self.bind_raw(at, &display, raw)?;
                self.index += 2;
            }
            None => self.index += 1,
        }
        Ok(())
    }

    fn parse_positional(&mut self, token: &str) -> Result<(), ParseError> {
        let arguments = &self.tree.command(self.command).arguments;
        let Some(argument) = arguments.get(self.argument_index) else {
            return Err(ParseError::TooManyArguments {
                expected: arguments.len(),
                token: token.to_string(),
            });
        };
        let target = format!("argument {:?}", argument.name());
        let parser = argument.parser().clone();

        let value = if argument.is_variadic() {
            let tokens = self.tokens;
            let end = tokens[self.index..]
                .iter()
                .position(|t| t == TERMINATOR)
                .map_or(tokens.len(), |offset| self.index + offset);

            let mut values = Vec::with_capacity(end - self.index);
            for raw in &tokens[self.index..end] {
                let value = parser.parse(raw).map_err(|source| ParseError::InvalidValue {
                    target: target.clone(),
                    raw: raw.clone(),
                    source,
                })?;
                values.push(value);
            }
            tracing::trace!(%target, count = values.len(), "bound variadic argument");
            self.index = end;
            Value::List(values)
        } else {
            let value = parser.parse(token).map_err(|source| ParseError::InvalidValue {
                target: target.clone(),
                raw: token.to_string(),
                source,
            })?;
            tracing::trace!(%target, "bound argument");
            self.index += 1;
            value
        };

        let index = self.argument_index;
        self.tree.command_mut(self.command).arguments[index].value = Some(value);
        self.argument_index += 1;
        Ok(())
    }

    fn resolve_short(&self, short: char) -> Result<FlagRef, ParseError> {
        self.tree
            .find_short_flag(self.command, short)
            .ok_or_else(|| ParseError::InvalidFlag {
                flag: dashify_short(short),
            })
    }

    fn value_token(&self, display: &str) -> Result<&'t str, ParseError> {
        let tokens = self.tokens;
        tokens
            .get(self.index + 1)
            .map(String::as_str)
            .ok_or_else(|| ParseError::MissingFlagValue {
                flag: display.to_string(),
            })
    }

    fn toggle(&mut self, at: FlagRef) {
        let value = self.tree.flag_at(at).toggled();
        self.bind(at, value);
    }

    fn bind_raw(&mut self, at: FlagRef, display: &str, raw: &str) -> Result<(), ParseError> {
        let value = self
            .tree
            .flag_at(at)
            .parser()
            .parse(raw)
            .map_err(|source| ParseError::InvalidValue {
                target: format!("flag {display:?}"),
                raw: raw.to_string(),
                source,
            })?;
        self.bind(at, value);
        Ok(())
    }

    fn bind(&mut self, at: FlagRef, value: Value) {
        let flag = self.tree.flag_at_mut(at);
        tracing::trace!(flag = flag.name(), %value, "bound flag");
        flag.value = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arg, command, flag, help_flag, version_flag};

    fn tree() -> CommandTree {
        command("test", "test command")
            .version("1.0.0")
            .flag(help_flag().short('h').inherited())
            .flag(version_flag().short('V'))
            .flag(flag("verbose", "").short('v').default(false).inherited())
            .flag(flag("port", "").short('p').default(3000i64))
            .flag(flag("host", "").short('H'))
            .handler(|_| Ok(()))
            .sub_command(
                command("commit", "")
                    .flag(flag("all", "").short('a').default(false))
                    .flag(flag("message", "").alias("msg").short('m'))
                    .handler(|_| Ok(())),
            )
            .sub_command(
                command("add", "")
                    .arg(arg("paths", "").variadic())
                    .handler(|_| Ok(())),
            )
            .sub_command(
                command("sum", "")
                    .arg(arg("first", "").parser(crate::ValueParser::int()))
                    .arg(arg("second", "").default(0i64))
                    .handler(|_| Ok(())),
            )
            .sub_command(command("remote", "").sub_command(command("show", "").arg(arg("name", ""))))
            .build()
            .unwrap()
    }

    fn value(tree: &CommandTree, path: &[&str], name: &str) -> Option<Value> {
        let id = tree.find(path).unwrap();
        tree.find_flag(id, name)
            .and_then(|f| f.value().cloned())
            .or_else(|| tree.find_argument(id, name).and_then(|a| a.value().cloned()))
    }

    #[test]
    fn long_flag_forms() {
        let mut t = tree();
        t.parse(["--port", "8080", "--host=localhost"]).unwrap();
        assert_eq!(value(&t, &[], "port"), Some(Value::Int(8080)));
        assert_eq!(value(&t, &[], "host"), Some(Value::from("localhost")));
    }

    #[test]
    fn equals_value_keeps_later_equals() {
        let mut t = tree();
        t.parse(["--host=a=b"]).unwrap();
        assert_eq!(value(&t, &[], "host"), Some(Value::from("a=b")));
    }

    #[test]
    fn bool_flags_toggle_without_consuming() {
        let mut t = tree();
        let parsed = t.parse(["commit", "-a", "-m", "msg"]).unwrap();
        assert_eq!(parsed.action, Action::Run);
        assert_eq!(value(&t, &["commit"], "all"), Some(Value::Bool(true)));
        assert_eq!(value(&t, &["commit"], "message"), Some(Value::from("msg")));
    }

    #[test]
    fn short_group_with_trailing_value() {
        let mut t = tree();
        let parsed = t.parse(["commit", "-am", "hello"]).unwrap();
        assert_eq!(parsed.command, t.find(&["commit"]).unwrap());
        assert_eq!(value(&t, &["commit"], "all"), Some(Value::Bool(true)));
        assert_eq!(value(&t, &["commit"], "message"), Some(Value::from("hello")));
    }

    #[test]
    fn short_group_rejects_equals_and_two_values() {
        let mut t = tree();
        match t.parse(["-vp=1"]).unwrap_err() {
            ParseError::FlagGroupWithEqual { token } => assert_eq!(token, "-vp=1"),
            other => panic!("expected FlagGroupWithEqual, got: {other:?}"),
        }

        match t.parse(["-pH", "1"]).unwrap_err() {
            ParseError::GroupValueConflict { first, second, .. } => {
                assert_eq!(first, "-p");
                assert_eq!(second, "-H");
            }
            other => panic!("expected GroupValueConflict, got: {other:?}"),
        }

        t.parse(["-p=9000"]).unwrap();
        assert_eq!(value(&t, &[], "port"), Some(Value::Int(9000)));
    }

    #[test]
    fn unknown_flags_are_named() {
        let mut t = tree();
        match t.parse(["-vx"]).unwrap_err() {
            ParseError::InvalidFlag { flag } => assert_eq!(flag, "-x"),
            other => panic!("expected InvalidFlag, got: {other:?}"),
        }
        match t.parse(["--nope=1"]).unwrap_err() {
            ParseError::InvalidFlag { flag } => assert_eq!(flag, "--nope"),
            other => panic!("expected InvalidFlag, got: {other:?}"),
        }
    }

    #[test]
    fn missing_value_at_end_of_input() {
        let mut t = tree();
        match t.parse(["--port"]).unwrap_err() {
            ParseError::MissingFlagValue { flag } => assert_eq!(flag, "--port"),
            other => panic!("expected MissingFlagValue, got: {other:?}"),
        }
        match t.parse(["commit", "-am"]).unwrap_err() {
            ParseError::MissingFlagValue { flag } => assert_eq!(flag, "-m"),
            other => panic!("expected MissingFlagValue, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_values_carry_the_parse_error() {
        let mut t = tree();
        match t.parse(["--port", "eighty"]).unwrap_err() {
            ParseError::InvalidValue { target, raw, source } => {
                assert_eq!(target, "flag \"--port\"");
                assert_eq!(raw, "eighty");
                assert_eq!(source.type_name(), "int");
            }
            other => panic!("expected InvalidValue, got: {other:?}"),
        }
    }

    #[test]
    fn inherited_flags_parse_below_root_only_when_inherited() {
        let mut t = tree();
        t.parse(["commit", "-v", "--msg", "x"]).unwrap();
        assert_eq!(value(&t, &[], "verbose"), Some(Value::Bool(true)));

        match t.parse(["commit", "--port", "1"]).unwrap_err() {
            ParseError::InvalidFlag { flag } => assert_eq!(flag, "--port"),
            other => panic!("expected InvalidFlag, got: {other:?}"),
        }
    }

    #[test]
    fn variadic_collects_until_terminator() {
        let mut t = tree();
        t.parse(["add", "a.txt", "b.txt", "--", "c"]).unwrap();
        assert_eq!(
            value(&t, &["add"], "paths"),
            Some(Value::List(vec![Value::from("a.txt"), Value::from("b.txt")]))
        );
        let add = t.find(&["add"]).unwrap();
        assert_eq!(t.command(add).rest(), ["c"]);
    }

    #[test]
    fn variadic_without_tokens_is_unbound_but_valid() {
        let mut t = tree();
        let parsed = t.parse(["add"]).unwrap();
        assert_eq!(parsed.action, Action::Run);
        assert_eq!(value(&t, &["add"], "paths"), None);
    }

    #[test]
    fn single_dash_is_positional() {
        let mut t = tree();
        t.parse(["add", "-"]).unwrap();
        assert_eq!(
            value(&t, &["add"], "paths"),
            Some(Value::List(vec![Value::from("-")]))
        );
    }

    #[test]
    fn too_many_and_missing_arguments() {
        let mut t = tree();
        match t.parse(["sum", "1", "2", "3"]).unwrap_err() {
            ParseError::TooManyArguments { expected, token } => {
                assert_eq!(expected, 2);
                assert_eq!(token, "3");
            }
            other => panic!("expected TooManyArguments, got: {other:?}"),
        }

        match t.parse(["sum"]).unwrap_err() {
            ParseError::ArgumentMissingValue { names } => assert_eq!(names, ["first"]),
            other => panic!("expected ArgumentMissingValue, got: {other:?}"),
        }
    }

    #[test]
    fn help_skips_input_validation() {
        let mut t = tree();
        let parsed = t.parse(["sum", "--help"]).unwrap();
        assert_eq!(parsed.action, Action::Help);
        assert_eq!(parsed.command, t.find(&["sum"]).unwrap());

        // Asserted before the transfer, on the root.
        let parsed = t.parse(["-h", "sum"]).unwrap();
        assert_eq!(parsed.action, Action::Help);
    }

    #[test]
    fn last_help_occurrence_decides() {
        let mut t = tree();
        let parsed = t.parse(["--help", "--help=false"]).unwrap();
        assert_eq!(parsed.action, Action::Run);
        assert_eq!(value(&t, &[], "help"), Some(Value::Bool(false)));

        let parsed = t.parse(["commit", "-h", "--help=false", "-h"]).unwrap();
        assert_eq!(parsed.action, Action::Help);
    }

    #[test]
    fn version_flag_dispatches_version() {
        let mut t = tree();
        assert_eq!(t.parse(["-V"]).unwrap().action, Action::Version);
    }

    #[test]
    fn command_without_handler_shows_help() {
        let mut t = command("git", "")
            .sub_command(command("remote", "").sub_command(command("show", "").handler(|_| Ok(()))))
            .build()
            .unwrap();
        assert_eq!(t.parse(["remote"]).unwrap().action, Action::Help);
        assert_eq!(t.parse(["remote", "show"]).unwrap().action, Action::Run);
    }

    #[test]
    fn ancestor_handler_runs_for_handlerless_command() {
        let mut t = tree();
        let parsed = t.parse(["remote"]).unwrap();
        assert_eq!(parsed.action, Action::Run);
        assert_eq!(parsed.command, t.find(&["remote"]).unwrap());
    }

    #[test]
    fn reparse_clears_previous_values() {
        let mut t = tree();
        t.parse(["--port", "1", "--", "x"]).unwrap();
        t.parse(Vec::<String>::new()).unwrap();
        assert_eq!(value(&t, &[], "port"), None);
        assert!(t.root().rest().is_empty());
    }

    #[test]
    fn last_occurrence_wins() {
        let mut t = tree();
        t.parse(["--port", "1", "-p", "2"]).unwrap();
        assert_eq!(value(&t, &[], "port"), Some(Value::Int(2)));
    }
}
