use async_trait::async_trait;
use parley_common::util::format_duration;
use tokio::time::Instant;

use super::UTIL_GROUP;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};

pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("ping", UTIL_GROUP)
            .description("Checks the round trip time of a reply.")
            .throttling(5, 10)
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, _: CommandArgs) -> anyhow::Result<()> {
        let start = Instant::now();
        ctxt.reply("Ping?").await?;
        let elapsed = start.elapsed();

        ctxt.reply(format!("Pong! The reply took {}.", format_duration(&elapsed)))
            .await?;
        Ok(())
    }
}
