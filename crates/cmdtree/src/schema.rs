//! Machine-readable description of a command tree.
//!
//! Hidden commands and flags are left out, as they are from help.

use serde::{Deserialize, Serialize};

use crate::command::{CommandId, CommandTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub flags: Vec<FlagSchema>,
    #[serde(default)]
    pub arguments: Vec<ArgumentSchema>,
    #[serde(default)]
    pub sub_commands: Vec<CommandSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlagSchema {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shorts: Vec<char>,
    pub value_type: String,
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    pub takes_value: bool,
    pub inherited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArgumentSchema {
    pub name: String,
    pub description: String,
    pub value_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    pub variadic: bool,
}

impl CommandTree {
    /// Describe `id` and its visible descendants. Flags include the inherited
    /// flags of ancestors.
    pub fn schema(&self, id: CommandId) -> CommandSchema {
        let command = self.command(id);

        let flags = self
            .visible_flags(id)
            .into_iter()
            .map(|flag| FlagSchema {
                name: flag.name().to_string(),
                description: flag.description().to_string(),
                aliases: flag.aliases().to_vec(),
                shorts: flag.shorts().to_vec(),
                value_type: flag.parser().type_name().to_string(),
                default: flag.default_value().to_string(),
                env: flag.env().map(str::to_string),
                takes_value: !flag.is_bool(),
                inherited: flag.is_inherited(),
            })
            .collect();

        let arguments = command
            .arguments()
            .iter()
            .map(|argument| ArgumentSchema {
                name: argument.name().to_string(),
                description: argument.description().to_string(),
                value_type: argument.parser().type_name().to_string(),
                default: argument.default_value().map(|v| v.to_string()),
                required: argument.is_required(),
                variadic: argument.is_variadic(),
            })
            .collect();

        let sub_commands = command
            .sub_commands()
            .iter()
            .filter(|child| !self.command(**child).is_hidden())
            .map(|child| self.schema(*child))
            .collect();

        CommandSchema {
            name: command.name().to_string(),
            description: command.description().to_string(),
            version: command.version().map(str::to_string),
            aliases: command.aliases().to_vec(),
            flags,
            arguments,
            sub_commands,
        }
    }

    /// The whole tree as pretty-printed JSON.
    pub fn schema_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.schema(CommandId::ROOT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arg, command, flag, help_flag};

    #[test]
    fn schema_uses_kebab_case_and_skips_hidden() {
        let tree = command("git", "tracker")
            .version("1.0")
            .flag(help_flag().short('h').inherited())
            .flag(flag("secret", "").hidden())
            .sub_command(
                command("checkout", "switch branches")
                    .alias("co")
                    .arg(arg("branch", "branch name")),
            )
            .sub_command(command("debug", "").hidden())
            .build()
            .unwrap();

        let schema = tree.schema(CommandId::ROOT);
        assert_eq!(schema.flags.len(), 1);
        assert_eq!(schema.sub_commands.len(), 1);

        let checkout = &schema.sub_commands[0];
        assert_eq!(checkout.aliases, ["co"]);
        assert_eq!(checkout.flags[0].name, "help");
        assert!(checkout.arguments[0].required);

        let json: serde_json::Value = serde_json::from_str(&tree.schema_json().unwrap()).unwrap();
        assert_eq!(json["sub-commands"][0]["name"], "checkout");
        assert_eq!(json["flags"][0]["takes-value"], false);
        assert_eq!(json["flags"][0]["shorts"][0], "h");
        assert_eq!(json["sub-commands"][0]["arguments"][0]["value-type"], "string");
    }

    #[test]
    fn schema_round_trips_through_json() {
        let tree = command("srv", "server")
            .flag(flag("port", "port").default(3000i64).env("PORT"))
            .build()
            .unwrap();
        let json = tree.schema_json().unwrap();
        let back: CommandSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree.schema(CommandId::ROOT));
        assert_eq!(back.flags[0].env.as_deref(), Some("PORT"));
        assert_eq!(back.flags[0].default, "3000");
    }
}
