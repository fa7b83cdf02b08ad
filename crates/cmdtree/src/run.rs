use std::io::{self, Write};

use crate::command::CommandTree;
use crate::completion::COMPLETE_COMMAND;
use crate::context::{Cancellation, Context, Env};
use crate::error::Error;
use crate::parse::{Action, Parsed};

impl CommandTree {
    /// Parse `tokens` and run the resolved command, writing help and version
    /// output to stdout.
    pub fn run<I, S>(&mut self, tokens: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with(tokens, &Env::Process, &Cancellation::new(), &mut out)
    }

    pub fn run_with<I, S>(
        &mut self,
        tokens: I,
        env: &Env,
        cancellation: &Cancellation,
        out: &mut impl Write,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();

        if self.completion_enabled()
            && tokens.first().is_some_and(|t| t == COMPLETE_COMMAND)
        {
            return self.print_completions(&tokens[1..], env, out);
        }

        let parsed = self.parse(tokens)?;
        self.dispatch(parsed, env, cancellation, out)
    }

    /// Carry out a parse result: print help, print the version or call the
    /// handler.
    pub fn dispatch(
        &self,
        parsed: Parsed,
        env: &Env,
        cancellation: &Cancellation,
        out: &mut impl Write,
    ) -> Result<(), Error> {
        let Parsed { command, action } = parsed;
        match action {
            Action::Help => {
                tracing::debug!(command = %self.qualified_name(command), "rendering help");
                self.write_help(command, out)?;
            }
            Action::Version => {
                writeln!(out, "{}", self.find_version(command).unwrap_or_default())?;
            }
            Action::Run => match self.resolve_handler(command) {
                Some(handler) => {
                    tracing::debug!(command = %self.qualified_name(command), "running handler");
                    let ctx = Context::new(self, command, env, cancellation);
                    handler(&ctx).map_err(Error::Handler)?;
                }
                None => self.write_help(command, out)?,
            },
        }
        Ok(())
    }

    fn print_completions(&self, words: &[String], env: &Env, out: &mut impl Write) -> Result<(), Error> {
        let results = match env.get("COMP_LINE").filter(|line| !line.trim().is_empty()) {
            Some(line) => self.complete_line(&line),
            None if words.is_empty() => self.complete(&[""]),
            None => self.complete(words),
        };
        tracing::debug!(candidates = results.len(), "completion requested");
        for result in results {
            writeln!(out, "{}", result.value)?;
        }
        Ok(())
    }
}
