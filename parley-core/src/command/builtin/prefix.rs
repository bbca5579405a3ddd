use anyhow::Context;
use async_trait::async_trait;
use parley_string_fmt::markdown::Markdown;
use twilight_model::guild::Permissions;

use super::UTIL_GROUP;
use crate::command::arguments::ArgumentBuilder;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};
use crate::directory::{Actor, missing_permissions};

/// Longest prefix a server may set.
const MAX_PREFIX_LENGTH: f64 = 14.0;

pub struct Prefix;

impl Prefix {
    async fn may_change(ctxt: &CommandCtxt<'_>) -> anyhow::Result<bool> {
        if ctxt.is_owner() {
            return Ok(true);
        }
        let Some(guild_id) = ctxt.guild_id() else {
            return Ok(false);
        };

        let granted = ctxt
            .data
            .services
            .directory
            .permissions(Actor::User(ctxt.author()), guild_id, ctxt.channel_id())
            .await
            .context("Failed to fetch member permissions")?;
        Ok(missing_permissions(granted, Permissions::MANAGE_GUILD).is_empty())
    }
}

#[async_trait]
impl Command for Prefix {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("prefix", UTIL_GROUP)
            .description("Shows or sets the command prefix.")
            .details(
                "If no prefix is provided, the current prefix will be shown. If the prefix is \"default\", the prefix \
                 will be reset to the default prefix. If the prefix is \"none\", the prefix will be removed entirely, \
                 only allowing mentions to run commands. Only server managers may change the prefix.",
            )
            .examples(["", "-", "default", "none"])
            .arguments([ArgumentBuilder::new("prefix")
                .prompt("What would you like to set the prefix to?")
                .types(["string"])
                .max(MAX_PREFIX_LENGTH)
                .required(false)
                .build()])
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let default_prefix = &ctxt.data.options.default_prefix;
        let requested = args.parsed().and_then(|a| a.str("prefix")).map(str::to_owned);

        let Some(guild_id) = ctxt.guild_id() else {
            if requested.is_some() {
                ctxt.reply("The prefix can only be changed in servers.").await?;
            } else {
                ctxt.reply("No prefix is needed in direct messages.").await?;
            }
            return Ok(());
        };

        let settings = ctxt.registry().settings();

        let Some(requested) = requested else {
            let current = settings
                .prefix(guild_id)
                .await
                .context("Failed to get server prefix")?
                .unwrap_or_else(|| default_prefix.clone());

            if current.is_empty() {
                ctxt.reply("This server has no command prefix. Mention me to run commands.")
                    .await?;
            } else {
                ctxt.reply(format!("This server's prefix is: {}", current.codestring()))
                    .await?;
            }
            return Ok(());
        };

        if !Self::may_change(&ctxt).await? {
            ctxt.reply("Only server managers may change the command prefix.").await?;
            return Ok(());
        }

        let reply = match requested.to_lowercase().as_str() {
            "default" => {
                settings.set_prefix(guild_id, None).await?;
                format!("Reset the command prefix to the default ({}).", default_prefix.codestring())
            },
            "none" => {
                settings.set_prefix(guild_id, Some(String::new())).await?;
                "Removed the command prefix entirely. Mention me to run commands.".to_owned()
            },
            _ => {
                settings
                    .set_prefix(guild_id, Some(requested.clone()))
                    .await
                    .context("Failed to set new prefix")?;
                format!("This server's prefix is now: {}", requested.codestring())
            },
        };

        ctxt.reply(reply).await?;
        Ok(())
    }
}
