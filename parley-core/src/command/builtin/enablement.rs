use async_trait::async_trait;
use parley_string_fmt::markdown::Markdown;
use twilight_model::guild::Permissions;

use super::COMMANDS_GROUP;
use crate::command::arguments::ArgumentBuilder;
use crate::command::errors::RegistryError;
use crate::command::registry::EnablementTarget;
use crate::command::types::ArgValue;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};

pub struct Enable;
pub struct Disable;

fn target_argument(verb: &str) -> ArgumentBuilder {
    let mut builder = ArgumentBuilder::new("target");
    builder
        .label("command or group")
        .prompt(format!("Which command or group would you like to {verb}?"))
        .types(["group", "command"]);
    builder
}

fn enablement_metadata(name: &str, description: &str) -> CommandMetadata {
    CommandBuilder::new(name, COMMANDS_GROUP)
        .description(description)
        .details(
            "The argument must be the name/ID of a command (partial or whole), or the exact name/ID of a \
             command group. In direct messages, only owners may use this, and it applies everywhere.",
        )
        .examples(["util", "misc:echo"])
        .user_permissions(Permissions::MANAGE_GUILD)
        .arguments([target_argument(name).build()])
        .build()
}

/// The target named by the `target` argument, with a display label like `` the `echo` command``.
fn resolve_target(args: &CommandArgs) -> Option<(EnablementTarget, String)> {
    match args.parsed()?.get("target")? {
        ArgValue::Command(command) => Some((
            command.target(),
            format!("the {} command", command.name().codestring()),
        )),
        ArgValue::Group(group) => Some((
            EnablementTarget::Group(group.id.clone()),
            format!("the {} group", group.name.codestring()),
        )),
        _ => None,
    }
}

/// Direct messages change global enablement, which only owners may do.
async fn allowed(ctxt: &CommandCtxt<'_>) -> anyhow::Result<bool> {
    if ctxt.guild_id().is_none() && !ctxt.is_owner() {
        ctxt.reply("Only the bot owner may enable or disable commands globally.")
            .await?;
        return Ok(false);
    }
    Ok(true)
}

#[async_trait]
impl Command for Enable {
    fn metadata(&self) -> CommandMetadata {
        enablement_metadata("enable", "Enables a command or command group.")
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let Some((target, label)) = resolve_target(&args) else {
            anyhow::bail!("missing enablement target");
        };
        if !allowed(&ctxt).await? {
            return Ok(());
        }

        let registry = ctxt.registry();
        registry.set_enabled(&target, ctxt.guild_id(), true).await?;

        // an enabled command still can't run inside a disabled group
        let group_disabled = match args.parsed().and_then(|a| a.get("target")) {
            Some(ArgValue::Command(command)) => !registry.is_group_enabled(&command.group, ctxt.guild_id()).await?,
            _ => false,
        };

        if group_disabled {
            ctxt.reply(format!(
                "Enabled {label}, but its group is disabled, so it still can't be used."
            ))
            .await?;
        } else {
            ctxt.reply(format!("Enabled {label}.")).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Command for Disable {
    fn metadata(&self) -> CommandMetadata {
        enablement_metadata("disable", "Disables a command or command group.")
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let Some((target, label)) = resolve_target(&args) else {
            anyhow::bail!("missing enablement target");
        };
        if !allowed(&ctxt).await? {
            return Ok(());
        }

        match ctxt.registry().set_enabled(&target, ctxt.guild_id(), false).await {
            Ok(()) => ctxt.reply(format!("Disabled {label}.")).await?,
            Err(RegistryError::Guarded(_)) => ctxt.reply(format!("You cannot disable {label}.")).await?,
            Err(e) => return Err(e.into()),
        };
        Ok(())
    }
}
