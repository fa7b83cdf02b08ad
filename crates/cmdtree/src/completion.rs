//! Shell completion: candidate generation and bash/zsh scripts.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::thread;

use anyhow::{Context as _, bail};

use crate::command::{CommandId, CommandTree};
use crate::schema::{ArgumentSchema, CommandSchema, FlagSchema};

/// The hidden first token that asks the program for completion candidates.
pub const COMPLETE_COMMAND: &str = "__complete";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompletionResult {
    pub value: String,
    pub description: String,
}

impl CompletionResult {
    fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

impl CommandTree {
    /// Completion candidates for the words typed after the program name.
    /// The last word is the one being completed and may be empty.
    pub fn complete<S: AsRef<str>>(&self, words: &[S]) -> Vec<CompletionResult> {
        let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
        let mut results = self.complete_from(CommandId::ROOT, &words);
        results.sort();
        results
    }

    /// Candidates for a `COMP_LINE` value, which starts with the program name.
    pub fn complete_line(&self, line: &str) -> Vec<CompletionResult> {
        let mut words: Vec<&str> = line.split_whitespace().skip(1).collect();
        if line.ends_with(char::is_whitespace) || words.is_empty() {
            words.push("");
        }
        self.complete(&words)
    }

    fn complete_from(&self, id: CommandId, words: &[&str]) -> Vec<CompletionResult> {
        let Some((current, before)) = words.split_last() else {
            return self.generate(id, &[], "");
        };
        if let Some((first, _)) = before.split_first() {
            if let Some(child) = self.sub_command_matching(id, first) {
                return self.complete_from(child, &words[1..]);
            }
        }
        self.generate(id, before, current)
    }

    fn generate(&self, id: CommandId, before: &[&str], current: &str) -> Vec<CompletionResult> {
        if let Some(prefix) = current.strip_prefix("--") {
            return self.complete_long_flags(id, prefix);
        }
        if current.starts_with('-') && current.len() > 1 {
            return self.complete_short_flags(id, current);
        }
        if before
            .last()
            .is_some_and(|previous| self.expects_value(id, previous))
        {
            return complete_files(current);
        }

        let sub_commands = self.complete_sub_commands(id, current);
        if !sub_commands.is_empty() {
            return sub_commands;
        }

        let arguments = self.command(id).arguments();
        let bound = self.count_positionals(id, before);
        let open = bound < arguments.len() || arguments.last().is_some_and(|a| a.is_variadic());
        if open {
            complete_files(current)
        } else {
            Vec::new()
        }
    }

    fn complete_long_flags(&self, id: CommandId, prefix: &str) -> Vec<CompletionResult> {
        let mut results = Vec::new();
        for flag in self.visible_flags(id) {
            if flag.name().starts_with(prefix) {
                results.push(CompletionResult::new(
                    format!("--{}", flag.name()),
                    flag.description(),
                ));
            }
            for alias in flag.aliases().iter().filter(|a| a.starts_with(prefix)) {
                results.push(CompletionResult::new(
                    format!("--{alias}"),
                    format!("{} (alias)", flag.description()),
                ));
            }
        }
        results
    }

    fn complete_short_flags(&self, id: CommandId, current: &str) -> Vec<CompletionResult> {
        let mut chars = current.chars().skip(1);
        let (Some(wanted), None) = (chars.next(), chars.next()) else {
            return Vec::new();
        };
        self.visible_flags(id)
            .into_iter()
            .filter(|flag| flag.shorts().contains(&wanted))
            .map(|flag| CompletionResult::new(format!("-{wanted}"), flag.description()))
            .collect()
    }

    fn complete_sub_commands(&self, id: CommandId, prefix: &str) -> Vec<CompletionResult> {
        let mut results = Vec::new();
        for sub in self.visible_sub_commands(id) {
            if sub.name().starts_with(prefix) {
                results.push(CompletionResult::new(sub.name(), sub.description()));
            }
            for alias in sub.aliases().iter().filter(|a| a.starts_with(prefix)) {
                results.push(CompletionResult::new(
                    alias.as_str(),
                    format!("{} (alias)", sub.description()),
                ));
            }
        }
        results
    }

    fn expects_value(&self, id: CommandId, word: &str) -> bool {
        let found = if let Some(long) = word.strip_prefix("--") {
            self.find_long_flag(id, long)
        } else {
            let mut chars = word.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some('-'), Some(short), None) => self.find_short_flag(id, short),
                _ => None,
            }
        };
        found.is_some_and(|at| !self.flag_at(at).is_bool())
    }

    fn count_positionals(&self, id: CommandId, words: &[&str]) -> usize {
        let mut count = 0;
        let mut skip_next = false;
        for (i, word) in words.iter().enumerate() {
            if skip_next {
                skip_next = false;
                continue;
            }
            if word.starts_with('-') {
                skip_next = self.expects_value(id, word) && i + 1 < words.len();
            } else if self.sub_command_matching(id, word).is_none() {
                count += 1;
            }
        }
        count
    }

    /// A bash script that asks the program for candidates through
    /// `COMP_LINE`. Requires completion to be enabled on the root.
    pub fn bash_completion_script(&self) -> String {
        let name = self.root().name();
        let function = function_name(&[name]);
        format!(
            r#"#!/bin/bash

{function}_completion() {{
    local cur
    cur="${{COMP_WORDS[COMP_CWORD]}}"

    local completions
    completions=$(COMP_LINE="${{COMP_LINE}}" {name} {COMPLETE_COMMAND} 2>/dev/null)

    if [[ $? -eq 0 ]]; then
        COMPREPLY=($(compgen -W "${{completions}}" -- "${{cur}}"))
    fi
}}

complete -F {function}_completion {name}
"#
        )
    }

    /// A self-contained zsh completion function, one `_arguments` call per
    /// command.
    pub fn zsh_completion_script(&self) -> String {
        let schema = self.schema(CommandId::ROOT);
        let mut out = format!("#compdef {}\n", schema.name);
        render_zsh_function(&mut out, &[schema.name.as_str()], &schema);
        let _ = writeln!(out, "\n{} \"$@\"", function_name(&[schema.name.as_str()]));
        out
    }

    /// Write the zsh script as `_<name>` into the first writable directory
    /// of zsh's `$fpath`.
    ///
    /// Returns `None` when zsh is not installed.
    pub fn install_zsh_completion(&self) -> anyhow::Result<Option<PathBuf>> {
        let zsh = match which::which("zsh") {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(error = %err, "zsh not found, skipping completion install");
                return Ok(None);
            }
        };

        let output = Process::new(&zsh)
            .args(["-c", "echo $fpath"])
            .output()
            .with_context(|| format!("running {}", zsh.display()))?;
        if !output.status.success() {
            bail!("{} exited with {}", zsh.display(), output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let directories: Vec<&str> = stdout
            .split_whitespace()
            .map(|d| d.trim_matches(|c| c == '(' || c == ')'))
            .filter(|d| !d.is_empty())
            .collect();
        if directories.is_empty() {
            bail!("no completion paths found in $fpath");
        }

        let file_name = format!("_{}", self.root().name());
        for directory in directories {
            let path = Path::new(directory).join(&file_name);
            match self.write_zsh_completion(&path) {
                Ok(_) => return Ok(Some(path)),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "fpath entry not writable")
                }
            }
        }
        bail!("no writable paths found in $fpath")
    }

    /// Write the zsh script to `path` unless it already holds the same
    /// content. Returns whether the file was written.
    pub fn write_zsh_completion(&self, path: &Path) -> anyhow::Result<bool> {
        let (existing, rendered) = thread::scope(|scope| {
            let existing = scope.spawn(|| match fs::read_to_string(path) {
                Ok(content) => Ok(Some(content)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            });
            let rendered = self.zsh_completion_script();
            (existing.join(), rendered)
        });

        let existing = match existing {
            Ok(result) => {
                result.with_context(|| format!("reading {}", path.display()))?
            }
            Err(_) => bail!("reading {} panicked", path.display()),
        };

        if existing.as_deref() == Some(rendered.as_str()) {
            tracing::debug!(path = %path.display(), "completion script up to date");
            return Ok(false);
        }

        fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote completion script");
        Ok(true)
    }
}

/// File and directory candidates starting with `current`.
fn complete_files(current: &str) -> Vec<CompletionResult> {
    let (directory, prefix) = match current.rfind('/') {
        Some(idx) => (&current[..=idx], &current[idx + 1..]),
        None => ("", current),
    };
    let read_from = if directory.is_empty() { "." } else { directory };

    let Ok(entries) = fs::read_dir(read_from) else {
        return Vec::new();
    };

    let mut results: Vec<CompletionResult> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(prefix) {
                return None;
            }
            let is_dir = entry.file_type().ok()?.is_dir();
            Some(if is_dir {
                CompletionResult::new(format!("{directory}{name}/"), "directory")
            } else {
                CompletionResult::new(format!("{directory}{name}"), "file")
            })
        })
        .collect();
    results.sort();
    results
}

fn function_name(path: &[&str]) -> String {
    let mut name = String::from("_");
    name.push_str(&path.join("_").replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
    name
}

fn render_zsh_function(out: &mut String, path: &[&str], command: &CommandSchema) {
    let function = function_name(path);
    let _ = writeln!(out, "\n{function}() {{");
    out.push_str("  local context state state_descr line\n");
    out.push_str("  typeset -A opt_args\n\n");
    out.push_str("  _arguments -C");

    for flag in &command.flags {
        for entry in zsh_flag_entries(flag) {
            let _ = write!(out, " \\\n    '{entry}'");
        }
    }
    if command.sub_commands.is_empty() {
        for argument in &command.arguments {
            let _ = write!(out, " \\\n    '{}'", zsh_argument_entry(argument));
        }
        out.push('\n');
    } else {
        out.push_str(" \\\n    '1: :->sub_commands'");
        out.push_str(" \\\n    '*:: :->args'\n");

        out.push_str("\n  case $state in\n");
        out.push_str("    sub_commands)\n");
        out.push_str("      local -a sub_commands\n");
        out.push_str("      sub_commands=(\n");
        for sub in &command.sub_commands {
            for name in std::iter::once(&sub.name).chain(&sub.aliases) {
                let _ = writeln!(
                    out,
                    "        '{}:{}'",
                    quote(&name.replace(':', "\\:")),
                    quote(&sub.description)
                );
            }
        }
        out.push_str("      )\n");
        out.push_str("      _describe -t sub-commands 'sub-command' sub_commands\n");
        out.push_str("      ;;\n");
        out.push_str("    args)\n");
        out.push_str("      case $line[1] in\n");
        for sub in &command.sub_commands {
            let mut sub_path = path.to_vec();
            sub_path.push(&sub.name);
            let names: Vec<&str> = std::iter::once(sub.name.as_str())
                .chain(sub.aliases.iter().map(String::as_str))
                .collect();
            let _ = writeln!(
                out,
                "        {}) {} ;;",
                names.join("|"),
                function_name(&sub_path)
            );
        }
        out.push_str("      esac\n");
        out.push_str("      ;;\n");
        out.push_str("  esac\n");
    }
    out.push_str("}\n");

    for sub in &command.sub_commands {
        let mut sub_path = path.to_vec();
        sub_path.push(&sub.name);
        render_zsh_function(out, &sub_path, sub);
    }
}

fn zsh_flag_entries(flag: &FlagSchema) -> Vec<String> {
    let description = quote(&bracket_escape(&flag.description));
    let value = if flag.takes_value {
        format!(":{}:_files", flag.name)
    } else {
        String::new()
    };

    std::iter::once(format!("--{}", flag.name))
        .chain(flag.aliases.iter().map(|a| format!("--{a}")))
        .chain(flag.shorts.iter().map(|s| format!("-{s}")))
        .map(|form| format!("{form}[{description}]{value}"))
        .collect()
}

fn zsh_argument_entry(argument: &ArgumentSchema) -> String {
    let description = quote(&argument.description.replace(':', "\\:"));
    if argument.variadic {
        format!("*:{description}:_files")
    } else if argument.required {
        format!(":{description}:_files")
    } else {
        format!("::{description}:_files")
    }
}

fn bracket_escape(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Make `text` safe inside a single-quoted shell word.
fn quote(text: &str) -> String {
    text.replace('\'', "'\\''")
}
