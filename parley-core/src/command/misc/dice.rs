use async_trait::async_trait;
use rand::Rng;

use super::MISC_GROUP;
use crate::command::{ArgsMode, Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

/// Rolls dice. Also answers to bare `2d6`-style messages.
pub struct Dice;

/// Parses `NdM`, `dM` or `M`.
fn parse_roll(input: &str) -> Option<(u32, u32)> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return Some((1, 6));
    }

    match input.split_once('d') {
        Some(("", sides)) => Some((1, sides.parse().ok()?)),
        Some((count, sides)) => Some((count.parse().ok()?, sides.parse().ok()?)),
        None => Some((1, input.parse().ok()?)),
    }
}

#[async_trait]
impl Command for Dice {
    fn metadata(&self) -> CommandMetadata {
        CommandBuilder::new("dice", MISC_GROUP)
            .aliases(["roll"])
            .description("Rolls some dice.")
            .details("Dice are written as `NdM`, e.g. `2d6` for two six-sided dice. Defaults to one six-sided die.")
            .format("[NdM]")
            .examples(["", "2d6", "d20"])
            .patterns([r"^(\d+)d(\d+)$"])
            .throttling(5, 10)
            .args_mode(ArgsMode::Single)
            .build()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        let roll = match &args {
            CommandArgs::Pattern(captures) => {
                let count = captures.get(1).cloned().flatten().unwrap_or_default();
                let sides = captures.get(2).cloned().flatten().unwrap_or_default();
                parse_roll(&format!("{count}d{sides}"))
            },
            CommandArgs::Raw(text) => parse_roll(text),
            _ => None,
        };

        let Some((count, sides)) = roll else {
            ctxt.reply("That doesn't look like a dice roll. Try something like `2d6`.")
                .await?;
            return Ok(());
        };
        if !(1..=MAX_DICE).contains(&count) || !(1..=MAX_SIDES).contains(&sides) {
            ctxt.reply(format!(
                "You can roll between 1 and {MAX_DICE} dice with up to {MAX_SIDES} sides each."
            ))
            .await?;
            return Ok(());
        }

        // thread_rng isn't Send, keep it out of the await below
        let rolls = {
            let mut rng = rand::thread_rng();
            (0..count).map(|_| rng.gen_range(1..=sides)).collect::<Vec<_>>()
        };
        let total = rolls.iter().map(|r| u64::from(*r)).sum::<u64>();

        let reply = if count == 1 {
            format!("Rolled **{count}d{sides}**: **{total}**")
        } else {
            let listed = rolls.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
            format!("Rolled **{count}d{sides}**: {listed} (total **{total}**)")
        };
        ctxt.reply(reply).await?;
        Ok(())
    }
}
