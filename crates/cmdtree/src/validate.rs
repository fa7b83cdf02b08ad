use std::collections::HashSet;

use crate::argument::Argument;
use crate::command::{CommandId, CommandTree};
use crate::error::{ParseError, Violation};
use crate::flag::Flag;
use crate::value::{Value, ValueKind};
use crate::value_parser::ValueParser;

/// Structural checks for one command. Every violation is collected.
pub(crate) fn validate_config(
    flags: &[Flag],
    arguments: &[Argument],
    sub_command_names: &[Vec<String>],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut longs = HashSet::new();
    let mut shorts = HashSet::new();
    for flag in flags {
        for long in flag.longs() {
            if let Some(violation) = check_token("flag", long) {
                violations.push(violation);
            }
            if !longs.insert(long) {
                violations.push(Violation::DuplicateFlag(long.to_string()));
            }
        }
        for short in flag.shorts() {
            if !shorts.insert(*short) {
                violations.push(Violation::DuplicateShort(*short));
            }
        }
        if let Some(violation) = check_default("flag", flag.name(), flag.parser(), flag.default_value()) {
            violations.push(violation);
        }
    }

    let mut argument_names = HashSet::new();
    let last = arguments.len().saturating_sub(1);
    for (position, argument) in arguments.iter().enumerate() {
        if let Some(violation) = check_token("argument", argument.name()) {
            violations.push(violation);
        }
        if !argument_names.insert(argument.name()) {
            violations.push(Violation::DuplicateArgument(argument.name().to_string()));
        }
        if let Some(default) = argument.default_value() {
            if let Some(violation) = check_default("argument", argument.name(), argument.parser(), default) {
                violations.push(violation);
            }
        }
        if argument.is_variadic() {
            if position != last {
                violations.push(Violation::VariadicNotLast {
                    name: argument.name().to_string(),
                    position: position + 1,
                });
            }
            if argument.default_value().is_some() {
                violations.push(Violation::VariadicWithDefault(argument.name().to_string()));
            }
        }
    }

    let mut sub_commands = HashSet::new();
    for name in sub_command_names.iter().flatten() {
        if !sub_commands.insert(name.as_str()) {
            violations.push(Violation::DuplicateSubCommand(name.clone()));
        }
    }

    if !sub_command_names.is_empty() && !arguments.is_empty() {
        violations.push(Violation::SubCommandsAndArguments);
    }

    violations
}

/// A default must be of the kind its parser produces. Custom parsers are
/// opaque and accept any default.
fn check_default(
    kind: &'static str,
    name: &str,
    parser: &ValueParser,
    default: &Value,
) -> Option<Violation> {
    let expected = parser.kind();
    if expected == ValueKind::Custom || default.kind() == expected {
        return None;
    }
    Some(Violation::DefaultTypeMismatch {
        kind,
        name: name.to_string(),
        expected,
        actual: default.type_name(),
    })
}

fn check_token(kind: &'static str, name: &str) -> Option<Violation> {
    if name.is_empty() {
        return Some(Violation::EmptyName(kind));
    }
    if name.split_whitespace().count() != 1 || name.len() != name.trim().len() {
        return Some(Violation::NameNotSingleToken {
            kind,
            name: name.to_string(),
        });
    }
    None
}

/// Every required argument of the command that will run must be bound.
pub(crate) fn validate_input(tree: &CommandTree, id: CommandId) -> Result<(), ParseError> {
    let names: Vec<String> = tree
        .command(id)
        .arguments()
        .iter()
        .filter(|argument| argument.is_required() && argument.value().is_none())
        .map(|argument| argument.name().to_string())
        .collect();

    if names.is_empty() {
        Ok(())
    } else {
        Err(ParseError::ArgumentMissingValue { names })
    }
}
