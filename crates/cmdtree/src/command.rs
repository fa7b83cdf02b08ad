//! The command tree: an arena of commands linked by index.

use std::fmt;
use std::sync::Arc;

use crate::argument::{Argument, ArgumentBuilder};
use crate::context::Context;
use crate::error::{BuildError, Violation};
use crate::flag::{Flag, FlagBuilder};
use crate::validate;

/// Index of a command inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(usize);

impl CommandId {
    pub const ROOT: CommandId = CommandId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A command handler. Errors are reported by the runner and mapped to an
/// exit code.
pub type Handler = Arc<dyn Fn(&Context<'_>) -> anyhow::Result<()> + Send + Sync>;

pub struct Command {
    name: String,
    description: String,
    version: Option<String>,
    aliases: Vec<String>,
    hidden: bool,
    parent: Option<CommandId>,
    sub_commands: Vec<CommandId>,
    pub(crate) flags: Vec<Flag>,
    pub(crate) arguments: Vec<Argument>,
    handler: Option<Handler>,

    pub(crate) rest: Vec<String>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parent", &self.parent)
            .field("sub_commands", &self.sub_commands)
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .field("has_handler", &self.handler.is_some())
            .field("rest", &self.rest)
            .finish()
    }
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The version declared on this command itself. See
    /// [`CommandTree::find_version`] for the inherited one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn sub_commands(&self) -> &[CommandId] {
        &self.sub_commands
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Tokens captured after `--` during the last parse.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    pub(crate) fn matches_name(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }
}

/// Location of a flag: the declaring command and its position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlagRef {
    pub(crate) command: CommandId,
    pub(crate) index: usize,
}

/// A validated tree of commands. The root is [`CommandId::ROOT`].
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<Command>,
    completion: bool,
}

impl CommandTree {
    pub fn root(&self) -> &Command {
        &self.nodes[CommandId::ROOT.0]
    }

    pub fn command(&self, id: CommandId) -> &Command {
        &self.nodes[id.0]
    }

    pub(crate) fn command_mut(&mut self, id: CommandId) -> &mut Command {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn completion_enabled(&self) -> bool {
        self.completion
    }

    /// Resolve a path of sub-command names or aliases from the root.
    ///
    /// `find(&["remote", "add"])` returns the id of `root remote add`.
    pub fn find(&self, path: &[&str]) -> Option<CommandId> {
        let mut current = CommandId::ROOT;
        for segment in path {
            current = self.sub_command_matching(current, segment)?;
        }
        Some(current)
    }

    pub(crate) fn sub_command_matching(&self, id: CommandId, token: &str) -> Option<CommandId> {
        self.command(id)
            .sub_commands
            .iter()
            .copied()
            .find(|child| self.command(*child).matches_name(token))
    }

    /// The command followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        std::iter::successors(Some(id), |current| self.command(*current).parent)
    }

    /// Names from the root down to `id`, joined by spaces.
    pub fn qualified_name(&self, id: CommandId) -> String {
        let mut names: Vec<&str> = self.ancestors(id).map(|a| self.command(a).name()).collect();
        names.reverse();
        names.join(" ")
    }

    /// The nearest version declared on the command or an ancestor.
    pub fn find_version(&self, id: CommandId) -> Option<&str> {
        self.ancestors(id).find_map(|a| self.command(a).version())
    }

    /// Long-form lookup used while parsing: own flags match freely, ancestor
    /// flags only when inherited.
    pub(crate) fn find_long_flag(&self, id: CommandId, long: &str) -> Option<FlagRef> {
        self.find_parsable_flag(id, |flag| flag.matches_long(long))
    }

    pub(crate) fn find_short_flag(&self, id: CommandId, short: char) -> Option<FlagRef> {
        self.find_parsable_flag(id, |flag| flag.shorts().contains(&short))
    }

    fn find_parsable_flag(&self, id: CommandId, matches: impl Fn(&Flag) -> bool) -> Option<FlagRef> {
        for current in self.ancestors(id) {
            let own = current == id;
            let found = self
                .command(current)
                .flags
                .iter()
                .position(|flag| (own || flag.is_inherited()) && matches(flag));
            if let Some(index) = found {
                return Some(FlagRef {
                    command: current,
                    index,
                });
            }
        }
        None
    }

    pub(crate) fn flag_at(&self, at: FlagRef) -> &Flag {
        &self.command(at.command).flags[at.index]
    }

    pub(crate) fn flag_at_mut(&mut self, at: FlagRef) -> &mut Flag {
        &mut self.command_mut(at.command).flags[at.index]
    }

    /// Accessor lookup by canonical name, walking the whole ancestor chain.
    pub fn find_flag(&self, id: CommandId, name: &str) -> Option<&Flag> {
        self.ancestors(id)
            .find_map(|a| self.command(a).flags.iter().find(|f| f.name() == name))
    }

    pub fn find_argument(&self, id: CommandId, name: &str) -> Option<&Argument> {
        self.ancestors(id)
            .find_map(|a| self.command(a).arguments.iter().find(|arg| arg.name() == name))
    }

    /// Flags shown in help and completion: the command's own non-hidden flags
    /// followed by non-hidden inherited flags of its ancestors.
    pub fn visible_flags(&self, id: CommandId) -> Vec<&Flag> {
        let mut visible: Vec<&Flag> = Vec::new();
        for current in self.ancestors(id) {
            let own = current == id;
            visible.extend(
                self.command(current)
                    .flags
                    .iter()
                    .filter(|f| !f.is_hidden() && (own || f.is_inherited())),
            );
        }
        visible
    }

    pub fn visible_sub_commands(&self, id: CommandId) -> impl Iterator<Item = &Command> + '_ {
        self.command(id)
            .sub_commands
            .iter()
            .map(|child| self.command(*child))
            .filter(|child| !child.hidden)
    }

    /// The command's own handler, or the nearest ancestor's.
    pub(crate) fn resolve_handler(&self, id: CommandId) -> Option<&Handler> {
        self.ancestors(id)
            .find_map(|a| self.command(a).handler.as_ref())
    }

    /// Clear every value bound by a previous parse.
    pub(crate) fn reset(&mut self) {
        for node in &mut self.nodes {
            node.rest.clear();
            for flag in &mut node.flags {
                flag.value = None;
            }
            for argument in &mut node.arguments {
                argument.value = None;
            }
        }
    }
}

/// Declarative description of a command and its children.
///
/// ```rust,ignore
/// let tree = cmdtree::command("git", "the stupid content tracker")
///     .version("2.43.0")
///     .flag(cmdtree::help_flag().short('h').inherited())
///     .sub_command(
///         cmdtree::command("checkout", "switch branches")
///             .arg(cmdtree::arg("branch", "branch to check out"))
///             .handler(|ctx| {
///                 let branch: String = ctx.arg("branch")?;
///                 println!("switched to {branch}");
///                 Ok(())
///             }),
///     )
///     .build()?;
/// ```
pub struct CommandBuilder {
    name: String,
    description: String,
    version: Option<String>,
    aliases: Vec<String>,
    hidden: bool,
    flags: Vec<FlagBuilder>,
    arguments: Vec<ArgumentBuilder>,
    sub_commands: Vec<CommandBuilder>,
    handler: Option<Handler>,
    completion: bool,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("flags", &self.flags.len())
            .field("arguments", &self.arguments.len())
            .field("sub_commands", &self.sub_commands)
            .finish_non_exhaustive()
    }
}

/// Start describing a command.
pub fn command(name: impl Into<String>, description: impl Into<String>) -> CommandBuilder {
    CommandBuilder {
        name: name.into(),
        description: description.into(),
        version: None,
        aliases: Vec::new(),
        hidden: false,
        flags: Vec::new(),
        arguments: Vec::new(),
        sub_commands: Vec::new(),
        handler: None,
        completion: false,
    }
}

impl CommandBuilder {
    /// Version printed by `--version` and in the help header. Sub-commands
    /// inherit it.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Leave the command out of help and completion. It still parses.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn flag(mut self, flag: FlagBuilder) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn arg(mut self, argument: ArgumentBuilder) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn sub_command(mut self, sub_command: CommandBuilder) -> Self {
        self.sub_commands.push(sub_command);
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Context<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Answer `__complete` requests from shell completion scripts. Only
    /// meaningful on the root command.
    pub fn enable_completion(mut self) -> Self {
        self.completion = true;
        self
    }

    /// Validate the whole tree and lay it out in an arena.
    pub fn build(self) -> Result<CommandTree, BuildError> {
        let mut tree = CommandTree {
            nodes: Vec::new(),
            completion: self.completion,
        };
        self.insert(&mut tree, None)?;
        tracing::trace!(commands = tree.nodes.len(), "command tree built");
        Ok(tree)
    }

    fn insert(self, tree: &mut CommandTree, parent: Option<CommandId>) -> Result<CommandId, BuildError> {
        let mut violations = Vec::new();

        let mut flags = Vec::with_capacity(self.flags.len());
        for builder in self.flags {
            match builder.build() {
                Ok(flag) => flags.push(flag),
                Err(violation) => violations.push(violation),
            }
        }

        let mut arguments = Vec::with_capacity(self.arguments.len());
        for builder in self.arguments {
            match builder.build() {
                Ok(argument) => arguments.push(argument),
                Err(violation) => violations.push(violation),
            }
        }

        let sub_command_names: Vec<Vec<String>> = self
            .sub_commands
            .iter()
            .map(|sub| {
                let mut names = vec![sub.name.clone()];
                names.extend(sub.aliases.iter().cloned());
                names
            })
            .collect();

        violations.extend(validate::validate_config(
            &flags,
            &arguments,
            &sub_command_names,
        ));

        // Children are checked even when this command is invalid; a failed
        // build discards the partial arena.
        let id = CommandId(tree.nodes.len());
        tree.nodes.push(Command {
            name: self.name,
            description: self.description,
            version: self.version,
            aliases: self.aliases,
            hidden: self.hidden,
            parent,
            sub_commands: Vec::new(),
            flags,
            arguments,
            handler: self.handler,
            rest: Vec::new(),
        });

        let mut children = Vec::with_capacity(self.sub_commands.len());
        for sub_command in self.sub_commands {
            match sub_command.insert(tree, Some(id)) {
                Ok(child) => children.push(child),
                Err(err) => violations.push(Violation::SubCommand(Box::new(err))),
            }
        }
        if !violations.is_empty() {
            return Err(BuildError::new(tree.command(id).name.clone(), violations));
        }

        tree.command_mut(id).sub_commands = children;
        Ok(id)
    }
}
