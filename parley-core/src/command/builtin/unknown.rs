use async_trait::async_trait;
use parley_string_fmt::markdown::Markdown;

use super::UTIL_GROUP;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};

/// Runs when a prefixed token names no command.
pub struct UnknownCommand;

#[async_trait]
impl Command for UnknownCommand {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("unknown-command", UTIL_GROUP)
            .description("Displays help information for when an unknown command is used.")
            .unknown(true)
            .hidden(true)
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        if let CommandArgs::Raw(token) = &args {
            tracing::debug!("unknown command {token:?} in {}", ctxt.data.invocation.scope());
        }

        ctxt.reply(format!(
            "Unknown command. Use {} to view the command list.",
            format!("{}help", ctxt.usage_prefix()).codestring()
        ))
        .await?;
        Ok(())
    }
}
