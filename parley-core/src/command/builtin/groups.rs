use std::fmt::Write;

use async_trait::async_trait;

use super::COMMANDS_GROUP;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};

pub struct Groups;

#[async_trait]
impl Command for Groups {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("groups", COMMANDS_GROUP)
            .aliases(["list-groups", "show-groups"])
            .description("Lists all command groups.")
            .details("Shows whether each group is enabled here. Guarded groups can't be disabled.")
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, _: CommandArgs) -> anyhow::Result<()> {
        let registry = ctxt.registry();

        let mut text = String::from("__**Groups**__");
        for group in registry.groups() {
            let enabled = registry.is_group_enabled(&group, ctxt.guild_id()).await?;
            let _ = write!(
                text,
                "\n**{}** ({}): {}",
                group.name,
                group.id,
                if enabled { "Enabled" } else { "Disabled" }
            );
            if group.guarded {
                text += " (guarded)";
            }
        }

        ctxt.reply(text).await?;
        Ok(())
    }
}
