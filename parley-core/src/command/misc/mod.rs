//! Small everyday commands in the `misc` group. Unlike the built-ins, these can be disabled.

use std::sync::Arc;

use async_trait::async_trait;
use parley_string_fmt::markdown::Markdown;
use rand::seq::SliceRandom;

use super::arguments::ArgumentBuilder;
use super::errors::ConfigurationError;
use super::group::CommandGroup;
use super::registry::CommandRegistry;
use super::types::ArgValue;
use super::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata, TCommand};

pub mod dice;

pub const MISC_GROUP: &str = "misc";

const CHOICES: [&str; 3] = ["rock", "paper", "scissors"];

pub fn register_misc(registry: &CommandRegistry) -> Result<(), ConfigurationError> {
    registry.register_group(CommandGroup::new(MISC_GROUP, "Misc").description("Everyday odds and ends"))?;

    let commands: [TCommand; 4] = [Arc::new(Echo), Arc::new(Sum), Arc::new(Choose), Arc::new(dice::Dice)];
    registry.register_commands(commands)
}

pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("echo", MISC_GROUP)
            .aliases(["say"])
            .description("Repeats what you say.")
            .examples(["hello world"])
            .arguments([ArgumentBuilder::new("text")
                .prompt("What would you like me to say?")
                .types(["string"])
                .max(2000.0)
                .build()])
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let text = args.parsed().and_then(|a| a.str("text")).unwrap_or_default();
        ctxt.reply(text.escape_mentions()).await?;
        Ok(())
    }
}

pub struct Sum;

#[async_trait]
impl Command for Sum {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("sum", MISC_GROUP)
            .aliases(["add"])
            .description("Adds numbers together.")
            .details("Give the numbers up front, or one at a time when asked. Reply `finish` once you're done.")
            .examples(["1 2 3"])
            .arguments([ArgumentBuilder::new("numbers")
                .label("number")
                .prompt("What number would you like to add? Every reply adds another one.")
                .types(["integer"])
                .infinite(true)
                .build()])
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let numbers = args.parsed().and_then(|a| a.list("numbers")).unwrap_or_default();
        let sum = numbers
            .iter()
            .filter_map(ArgValue::as_integer)
            .try_fold(0i64, i64::checked_add);

        match sum {
            Some(sum) => ctxt.reply(format!("The sum is **{sum}**.")).await?,
            None => ctxt.reply("That sum is too large for me to work out.").await?,
        };
        Ok(())
    }
}

pub struct Choose;

#[async_trait]
impl Command for Choose {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("choose", MISC_GROUP)
            .aliases(["rps"])
            .description("Plays rock, paper, scissors.")
            .examples(["rock"])
            .arguments([ArgumentBuilder::new("choice")
                .prompt("Rock, paper or scissors?")
                .types(["string"])
                .one_of(CHOICES)
                .build()])
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let choice = args
            .parsed()
            .and_then(|a| a.str("choice"))
            .unwrap_or_default()
            .to_lowercase();
        let Some(mine) = CHOICES.choose(&mut rand::thread_rng()).copied() else {
            anyhow::bail!("no choices to pick from");
        };

        ctxt.reply(format!("I choose **{mine}**. {}", verdict(&choice, mine)))
            .await?;
        Ok(())
    }
}

/// Result from the user's point of view.
fn verdict(theirs: &str, mine: &str) -> &'static str {
    match (theirs, mine) {
        _ if theirs == mine => "It's a tie!",
        ("rock", "scissors") | ("paper", "rock") | ("scissors", "paper") => "You win!",
        _ => "I win!",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::command::builtin::tests::builtin_dispatcher;
    use crate::gateway_handler::dispatcher::Dispatcher;
    use crate::testing::{MockDirectory, MockTransport, invocation};

    pub fn misc_dispatcher(transport: Arc<MockTransport>) -> Dispatcher {
        let dispatcher = builtin_dispatcher(transport, MockDirectory::default());
        register_misc(dispatcher.registry()).unwrap();
        dispatcher
    }

    #[test]
    fn verdicts() {
        assert_eq!(verdict("rock", "rock"), "It's a tie!");
        assert_eq!(verdict("rock", "scissors"), "You win!");
        assert_eq!(verdict("rock", "paper"), "I win!");
        assert_eq!(verdict("scissors", "paper"), "You win!");
    }

    #[tokio::test]
    async fn echo_escapes_mentions() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = misc_dispatcher(transport.clone());

        dispatcher.handle(invocation("!say hi   @everyone")).await.unwrap();
        assert_eq!(transport.messages(), vec!["hi   @\u{200b}everyone"]);
    }

    #[tokio::test]
    async fn sum_adds_every_number() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = misc_dispatcher(transport.clone());

        dispatcher.handle(invocation("!sum 1 2 39")).await.unwrap();
        assert_eq!(transport.messages(), vec!["The sum is **42**."]);
    }

    #[tokio::test]
    async fn choose_accepts_any_case() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = misc_dispatcher(transport.clone());

        let outcome = dispatcher.handle(invocation("!choose PAPER")).await.unwrap();
        assert_eq!(outcome.state(), "completed");
        assert!(transport.messages()[0].starts_with("I choose **"));
    }

    #[tokio::test]
    async fn misc_commands_can_be_disabled() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = misc_dispatcher(transport.clone());

        dispatcher.handle(invocation("!disable misc")).await.unwrap();
        assert_eq!(dispatcher.handle(invocation("!echo hi")).await.unwrap().state(), "blocked");
    }
}
