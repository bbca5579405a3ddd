use std::fmt::Write;

use async_trait::async_trait;
use parley_string_fmt::markdown::{Markdown, disambiguation};

use super::UTIL_GROUP;
use crate::command::arguments::ArgumentBuilder;
use crate::command::registry::RegisteredCommand;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};
use crate::gateway_handler::ReplyTarget;

/// Past this many matches, help asks for a better search instead of listing them.
const MAX_CANDIDATES: usize = 15;

pub struct Help;

/// Whether `command` should show up in help for this invocation.
fn usable(ctxt: &CommandCtxt<'_>, command: &RegisteredCommand) -> bool {
    let metadata = &command.metadata;
    let direct = ctxt.data.invocation.is_direct();

    !metadata.hidden
        && !metadata.unknown
        && (!metadata.owner_only || ctxt.is_owner())
        && !(metadata.guild_only && direct)
        && !(metadata.dm_only && !direct)
}

fn details(ctxt: &CommandCtxt<'_>, command: &RegisteredCommand) -> String {
    let metadata = &command.metadata;
    let prefix = ctxt.usage_prefix();

    let mut text = format!("__Command **{}**:__ {}", command.name(), metadata.description);
    if metadata.guild_only {
        text += " (Usable only in servers)";
    }
    if metadata.nsfw {
        text += " (NSFW)";
    }

    let _ = write!(
        text,
        "\n\n**Format:** {}",
        format!("{prefix}{}", command.usage()).codestring()
    );
    if !metadata.aliases.is_empty() {
        let _ = write!(text, "\n**Aliases:** {}", metadata.aliases.join(", "));
    }
    let _ = write!(
        text,
        "\n**Group:** {} ({})",
        command.group.name,
        command.qualified_name().codestring()
    );
    if let Some(details) = &metadata.details {
        let _ = write!(text, "\n**Details:** {details}");
    }
    if !metadata.examples.is_empty() {
        let examples = metadata
            .examples
            .iter()
            .map(|e| format!("{prefix}{} {e}", command.name()).trim_end().codestring())
            .collect::<Vec<_>>()
            .join("\n");
        let _ = write!(text, "\n**Examples:**\n{examples}");
    }

    text
}

fn listing(ctxt: &CommandCtxt<'_>) -> String {
    let prefix = ctxt.usage_prefix();
    let registry = ctxt.registry();

    let mut text = format!(
        "To run a command, use {}. Use {} to view detailed information about a specific command.\n",
        format!("{prefix}command").codestring(),
        format!("{prefix}help <command>").codestring()
    );

    for group in registry.groups() {
        let commands = registry
            .group_commands(&group.id)
            .into_iter()
            .filter(|c| usable(ctxt, c))
            .collect::<Vec<_>>();
        if commands.is_empty() {
            continue;
        }

        let _ = write!(text, "\n__**{}**__", group.name);
        for command in commands {
            let _ = write!(text, "\n**{}:** {}", command.name(), command.metadata.description);
        }
        text.push('\n');
    }

    text
}

#[async_trait]
impl Command for Help {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("help", UTIL_GROUP)
            .aliases(["commands"])
            .description("Displays a list of available commands, or detailed information for a specific command.")
            .details("The command may be part of a command name or a whole command name.")
            .examples(["", "prefix"])
            .arguments([ArgumentBuilder::new("command")
                .prompt("Which command would you like to view the help for?")
                .types(["string"])
                .required(false)
                .build()])
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let search = args.parsed().and_then(|a| a.str("command")).map(str::to_owned);

        let Some(search) = search else {
            let handle = ctxt.direct(listing(&ctxt)).await?;
            if !ctxt.data.invocation.is_direct() && matches!(handle.target, ReplyTarget::User(_)) {
                ctxt.reply("Sent you a DM with information.").await?;
            }
            return Ok(());
        };

        let registry = ctxt.registry();
        let mut found = registry.find_commands(&search, true, |c| usable(&ctxt, c));
        if found.is_empty() {
            found = registry.find_commands(&search, false, |c| usable(&ctxt, c));
        }

        match found.len() {
            0 => {
                ctxt.reply(format!(
                    "Unable to identify command. Use {} to view the list of all commands.",
                    format!("{}help", ctxt.usage_prefix()).codestring()
                ))
                .await?;
            },
            1 => {
                ctxt.reply(details(&ctxt, &found[0])).await?;
            },
            n if n > MAX_CANDIDATES => {
                ctxt.reply("Multiple commands found. Please be more specific.").await?;
            },
            _ => {
                ctxt.reply(disambiguation(found.iter().map(|c| c.name()), "commands"))
                    .await?;
            },
        }

        Ok(())
    }
}
