use std::fmt::Write as _;
use std::io;

use crate::command::{CommandId, CommandTree};
use crate::flag::Flag;

impl CommandTree {
    /// Render help for a command.
    ///
    /// ```text
    /// git 2.43.0: the stupid content tracker
    ///
    /// Usage:
    ///   git commit [flags]
    ///
    /// Flags:
    ///   --message --msg  -m  commit message  (type: string, default: "")
    /// ```
    pub fn render_help(&self, id: CommandId) -> String {
        let root = self.root();
        let command = self.command(id);
        let mut out = String::new();

        match self.find_version(id) {
            Some(version) => {
                let _ = writeln!(out, "{} {}: {}", root.name(), version, root.description());
            }
            None => {
                let _ = writeln!(out, "{}: {}", root.name(), root.description());
            }
        }

        let flags = self.visible_flags(id);
        let sub_commands: Vec<_> = self.visible_sub_commands(id).collect();

        let mut usage = self.qualified_name(id);
        if !flags.is_empty() {
            usage.push_str(" [flags]");
        }
        if !sub_commands.is_empty() {
            usage.push_str(" [sub-commands]");
        }
        for argument in command.arguments() {
            usage.push(' ');
            usage.push_str(&argument.in_brackets());
        }
        let _ = write!(out, "\nUsage:\n  {usage}\n");

        if !sub_commands.is_empty() {
            out.push_str("\nSub-commands:\n");
            let rows: Vec<Vec<String>> = sub_commands
                .iter()
                .map(|sub| {
                    vec![
                        String::new(),
                        format!("{}: {}", sub.name(), sub.description()),
                    ]
                })
                .collect();
            out.push_str(&table(&rows));
        }

        if !command.arguments().is_empty() {
            out.push_str("\nArguments:\n");
            let rows: Vec<Vec<String>> = command
                .arguments()
                .iter()
                .map(|argument| {
                    let details = match argument.default_value() {
                        Some(default) => format!(
                            "(type: {}, default: {:?})",
                            argument.parser().type_name(),
                            default.to_string()
                        ),
                        None => format!("(type: {})", argument.parser().type_name()),
                    };
                    vec![
                        String::new(),
                        argument.in_brackets(),
                        argument.description().to_string(),
                        details,
                    ]
                })
                .collect();
            out.push_str(&table(&rows));
        }

        if !flags.is_empty() {
            out.push_str("\nFlags:\n");
            let rows: Vec<Vec<String>> = flags.iter().map(|flag| flag_row(flag)).collect();
            out.push_str(&table(&rows));
        }

        out.push('\n');
        out
    }

    pub fn write_help(&self, id: CommandId, w: &mut impl io::Write) -> io::Result<()> {
        w.write_all(self.render_help(id).as_bytes())
    }
}

fn flag_row(flag: &Flag) -> Vec<String> {
    let longs: Vec<String> = flag.longs().map(|long| format!("--{long}")).collect();
    let shorts = if flag.shorts().is_empty() {
        String::new()
    } else {
        format!("-{}", flag.shorts().iter().collect::<String>())
    };
    let default = format!("{:?}", flag.default_value().to_string());
    let default = match flag.env() {
        Some(var) => format!("${var}, {default}"),
        None => default,
    };

    vec![
        String::new(),
        longs.join(" "),
        shorts,
        flag.description().to_string(),
        format!("(type: {}, default: {default})", flag.parser().type_name()),
    ]
}

/// Align cells into columns two spaces apart. The last cell of a row is
/// written as is.
fn table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in rows {
        let last = row.len().saturating_sub(1);
        for (i, cell) in row.iter().enumerate() {
            if i == last {
                out.push_str(cell);
            } else {
                let _ = write!(out, "{:width$}", cell, width = widths[i] + 2);
            }
        }
        out.push('\n');
    }
    out
}
