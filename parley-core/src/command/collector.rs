//! Multi-turn argument collection.
//!
//! A [`Session`] is the per-invocation state the prompt loop runs on: who is being asked, where,
//! and the open [`Conversation`] their replies arrive through. The [`ArgumentCollector`] walks a
//! command's arguments in declaration order and obtains each one through the session.

use std::time::Duration;

use parley_common::config::config::Commands;
use parley_common::util::split_args;

use super::arguments::{Argument, ArgumentResult};
use super::errors::CancelReason;
use super::messagebuilder::MessageBuilder;
use super::registry::CommandRegistry;
use super::types::{ArgValues, TypeCtxt};
use crate::directory::GuildDirectory;
use crate::gateway_handler::conversation::{Conversation, Conversations};
use crate::gateway_handler::reply::send_logged;
use crate::gateway_handler::{Invocation, ReplyTarget, ResponseHandle, Transport};
use crate::metrics::Metrics;

/// Prompt loop settings.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Invalid replies accepted per argument before collection is cancelled.
    pub prompt_limit: u32,
    /// How long to wait for a reply when the argument doesn't say otherwise.
    pub wait: Duration,
    pub cancel_token: String,
    pub finish_token: String,
    pub single_quotes: bool,
}
impl PromptOptions {
    pub fn from_config(commands: &Commands) -> Self {
        Self {
            prompt_limit: commands.prompt_limit,
            wait: Duration::from_secs(commands.argument_wait_secs),
            cancel_token: commands.cancel_token.clone(),
            finish_token: commands.finish_token.clone(),
            single_quotes: commands.single_quotes,
        }
    }
}
impl Default for PromptOptions {
    fn default() -> Self {
        Self::from_config(&Commands::default())
    }
}

/// State shared by every argument obtained for one invocation.
pub struct Session<'a> {
    invocation: &'a Invocation,
    registry: &'a CommandRegistry,
    transport: &'a dyn Transport,
    directory: &'a dyn GuildDirectory,
    conversations: &'a Conversations,
    options: &'a PromptOptions,
    metrics: Option<&'a Metrics>,
    conversation: Option<Conversation>,
}
impl<'a> Session<'a> {
    pub fn new(
        invocation: &'a Invocation,
        registry: &'a CommandRegistry,
        transport: &'a dyn Transport,
        directory: &'a dyn GuildDirectory,
        conversations: &'a Conversations,
        options: &'a PromptOptions,
    ) -> Self {
        Self {
            invocation,
            registry,
            transport,
            directory,
            conversations,
            options,
            metrics: None,
            conversation: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn invocation(&self) -> &'a Invocation {
        self.invocation
    }

    pub fn options(&self) -> &'a PromptOptions {
        self.options
    }

    /// A type context over `collected`. It borrows nothing from the session itself, so the
    /// session stays free for prompting while the context is alive.
    pub fn type_ctxt<'c>(&self, collected: &'c ArgValues) -> TypeCtxt<'c>
    where
        'a: 'c,
    {
        TypeCtxt {
            author: self.invocation.author,
            channel_id: self.invocation.channel_id,
            guild_id: self.invocation.guild_id,
            registry: self.registry,
            directory: self.directory,
            collected,
        }
    }

    /// Sends a prompt to the invocation's channel. The conversation is opened before sending so
    /// that a reply can never arrive before anyone listens for it.
    pub async fn prompt(&mut self, text: impl Into<MessageBuilder>) -> Option<ResponseHandle> {
        if self.conversation.is_none() {
            self.conversation = Some(
                self.conversations
                    .open(self.invocation.author, self.invocation.channel_id),
            );
        }

        if let Some(metrics) = self.metrics {
            metrics.add_prompt();
        }

        send_logged(
            self.transport,
            ReplyTarget::Channel(self.invocation.channel_id),
            text,
        )
        .await
    }

    /// Waits for the author's next message in the channel. `None` means nothing came in time.
    pub async fn next_reply(&mut self, wait: Duration) -> Option<String> {
        let (conversations, invocation) = (self.conversations, self.invocation);
        let conversation = self
            .conversation
            .get_or_insert_with(|| conversations.open(invocation.author, invocation.channel_id));
        conversation.next(wait).await
    }
}

/// Outcome of a whole collection.
#[derive(Debug, Default)]
pub struct CollectorResult {
    pub values: ArgValues,
    /// Set when collection stopped early. `values` then holds what was obtained before.
    pub cancelled: Option<CancelReason>,
    pub prompts: Vec<ResponseHandle>,
    pub answers: Vec<String>,
}

pub struct ArgumentCollector {
    args: Vec<Argument>,
    prompt_limit: Option<u32>,
}
impl ArgumentCollector {
    /// `prompt_limit` overrides [`PromptOptions::prompt_limit`] for every argument.
    pub fn new(args: Vec<Argument>, prompt_limit: Option<u32>) -> Self {
        Self { args, prompt_limit }
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// How many values an inline argument string should be split into. `None` when the last
    /// argument is infinite and takes every remaining value.
    pub fn split_count(&self) -> Option<usize> {
        match self.args.last() {
            Some(last) if last.spec.infinite => None,
            _ => Some(self.args.len()),
        }
    }

    /// Obtains every argument from positional `provided` values, prompting for what's missing
    /// or invalid.
    pub async fn obtain(&self, session: &mut Session<'_>, provided: &[String]) -> anyhow::Result<CollectorResult> {
        let slots = self
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if arg.spec.infinite {
                    provided.get(i..).map(<[String]>::to_vec).unwrap_or_default()
                } else {
                    provided.get(i).cloned().into_iter().collect()
                }
            })
            .collect();

        self.obtain_slots(session, slots).await
    }

    /// Like [`ArgumentCollector::obtain`], but values are matched to arguments by key.
    pub async fn obtain_named(
        &self,
        session: &mut Session<'_>,
        options: &[(String, String)],
    ) -> anyhow::Result<CollectorResult> {
        let single_quotes = session.options().single_quotes;
        let slots = self
            .args
            .iter()
            .map(|arg| {
                let value = options.iter().find(|(key, _)| *key == arg.spec.key).map(|(_, v)| v);
                match value {
                    Some(value) if arg.spec.infinite => split_args(value, None, single_quotes),
                    Some(value) => vec![value.clone()],
                    None => vec![],
                }
            })
            .collect();

        self.obtain_slots(session, slots).await
    }

    async fn obtain_slots(&self, session: &mut Session<'_>, slots: Vec<Vec<String>>) -> anyhow::Result<CollectorResult> {
        let mut result = CollectorResult::default();
        let limit = self.prompt_limit.unwrap_or(session.options().prompt_limit);

        for (arg, provided) in self.args.iter().zip(slots) {
            let ArgumentResult {
                value,
                cancelled,
                prompts,
                answers,
            } = if arg.spec.infinite {
                arg.obtain_infinite(session, &result.values, &provided, limit).await?
            } else {
                arg.obtain(session, &result.values, provided.first().map(String::as_str), limit)
                    .await?
            };

            result.prompts.extend(prompts);
            result.answers.extend(answers);

            if let Some(reason) = cancelled {
                result.cancelled = Some(reason);
                return Ok(result);
            }

            if let Some(value) = value {
                result.values.insert(arg.spec.key.clone(), value);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::command::arguments::{ArgDefault, ArgumentBuilder};
    use crate::command::types::ArgValue;
    use crate::testing::{MockDirectory, MockTransport, invocation, registry_with_ping};

    fn collector(registry: &CommandRegistry, specs: Vec<crate::command::arguments::ArgumentSpec>) -> ArgumentCollector {
        let args = specs
            .into_iter()
            .map(|spec| Argument::new(spec, registry.types(), "test").unwrap())
            .collect();
        ArgumentCollector::new(args, None)
    }

    #[tokio::test]
    async fn provided_values_skip_prompting() {
        let registry = registry_with_ping();
        let transport = MockTransport::new();
        let conversations = Conversations::new();
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("count").types(["integer"]).build(),
            ArgumentBuilder::new("text").types(["string"]).build(),
        ]);
        let result = collector
            .obtain(&mut session, &["3".to_owned(), "hello there".to_owned()])
            .await
            .unwrap();

        assert!(result.cancelled.is_none());
        assert!(result.prompts.is_empty());
        assert_eq!(result.values.integer("count"), Some(3));
        assert_eq!(result.values.str("text"), Some("hello there"));
    }

    #[tokio::test]
    async fn missing_values_are_prompted_for() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new().replying(&conversations, ["abc", "7"]);
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![ArgumentBuilder::new("count").types(["integer"]).build()]);
        let result = collector.obtain(&mut session, &[]).await.unwrap();

        assert!(result.cancelled.is_none());
        assert_eq!(result.values.integer("count"), Some(7));
        assert_eq!(result.prompts.len(), 2);
        assert_eq!(result.answers, vec!["abc", "7"]);
    }

    #[tokio::test]
    async fn three_invalid_replies_hit_a_prompt_limit_of_two() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new().replying(&conversations, ["a", "b", "c", "4"]);
        let options = PromptOptions {
            prompt_limit: 2,
            ..PromptOptions::default()
        };
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![ArgumentBuilder::new("count").types(["integer"]).build()]);
        let result = collector.obtain(&mut session, &[]).await.unwrap();

        assert_eq!(result.cancelled, Some(CancelReason::PromptLimit));
        assert_eq!(result.answers.len(), 3);
        assert!(!result.values.contains("count"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_reply_cancels_with_time() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new();
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("count")
                .types(["integer"])
                .wait(Duration::from_secs(1))
                .build(),
        ]);

        let start = tokio::time::Instant::now();
        let result = collector.obtain(&mut session, &[]).await.unwrap();

        assert_eq!(result.cancelled, Some(CancelReason::Time));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancel_stops_collection_with_partial_values() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new().replying(&conversations, ["CANCEL"]);
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("first").types(["string"]).build(),
            ArgumentBuilder::new("second").types(["string"]).build(),
            ArgumentBuilder::new("third").types(["string"]).build(),
        ]);
        let result = collector.obtain(&mut session, &["one".to_owned()]).await.unwrap();

        assert_eq!(result.cancelled, Some(CancelReason::User));
        assert_eq!(result.values.str("first"), Some("one"));
        assert!(!result.values.contains("second"));
        assert_eq!(result.prompts.len(), 1);
    }

    #[tokio::test]
    async fn defaults_and_optional_arguments() {
        let registry = registry_with_ping();
        let transport = MockTransport::new();
        let conversations = Conversations::new();
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("sides")
                .types(["integer"])
                .default(ArgDefault::Value(ArgValue::Integer(6)))
                .build(),
            ArgumentBuilder::new("who")
                .types(["user"])
                .default(ArgDefault::Producer(Arc::new(|cx: &TypeCtxt<'_>| ArgValue::User(cx.author))))
                .build(),
            ArgumentBuilder::new("note").types(["string"]).required(false).build(),
        ]);
        let result = collector.obtain(&mut session, &[]).await.unwrap();

        assert!(result.cancelled.is_none());
        assert!(result.prompts.is_empty());
        assert_eq!(result.values.integer("sides"), Some(6));
        assert_eq!(result.values.get("who").and_then(ArgValue::as_user), Some(inv.author));
        assert!(!result.values.contains("note"));
    }

    #[tokio::test]
    async fn infinite_arguments_take_remaining_values() {
        let registry = registry_with_ping();
        let transport = MockTransport::new();
        let conversations = Conversations::new();
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("label").types(["string"]).build(),
            ArgumentBuilder::new("numbers").types(["integer"]).infinite(true).build(),
        ]);
        let provided = ["total", "1", "2", "3"].map(str::to_owned);
        let result = collector.obtain(&mut session, &provided).await.unwrap();

        let numbers = result.values.list("numbers").unwrap();
        assert_eq!(numbers.iter().filter_map(ArgValue::as_integer).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(collector.split_count(), None);
    }

    #[tokio::test]
    async fn infinite_arguments_prompt_until_finish() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new().replying(&conversations, ["4", "x", "5", "finish"]);
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("numbers").types(["integer"]).infinite(true).build(),
        ]);
        let result = collector.obtain(&mut session, &[]).await.unwrap();

        assert!(result.cancelled.is_none());
        let numbers = result.values.list("numbers").unwrap();
        assert_eq!(numbers.iter().filter_map(ArgValue::as_integer).collect::<Vec<_>>(), vec![4, 5]);
        // the initial prompt and one retry after "x"
        assert_eq!(result.prompts.len(), 2);
    }

    #[tokio::test]
    async fn skipping_a_bad_item_keeps_the_rest() {
        let registry = registry_with_ping();
        let conversations = Conversations::new();
        let transport = MockTransport::new().replying(&conversations, ["finish"]);
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("numbers").types(["integer"]).infinite(true).build(),
        ]);
        let provided = ["1", "x", "3"].map(str::to_owned);
        let result = collector.obtain(&mut session, &provided).await.unwrap();

        assert!(result.cancelled.is_none());
        let numbers = result.values.list("numbers").unwrap();
        assert_eq!(numbers.iter().filter_map(ArgValue::as_integer).collect::<Vec<_>>(), vec![1, 3]);
        // only "x" was asked about again
        assert_eq!(result.prompts.len(), 1);
    }

    #[tokio::test]
    async fn named_values_match_by_key() {
        let registry = registry_with_ping();
        let transport = MockTransport::new();
        let conversations = Conversations::new();
        let options = PromptOptions::default();
        let inv = invocation("unused");
        let directory = MockDirectory::default();
        let mut session = Session::new(&inv, &registry, &transport, &directory, &conversations, &options);

        let collector = collector(&registry, vec![
            ArgumentBuilder::new("a").types(["integer"]).build(),
            ArgumentBuilder::new("b").types(["integer"]).build(),
        ]);
        let options = vec![("b".to_owned(), "2".to_owned()), ("a".to_owned(), "1".to_owned())];
        let result = collector.obtain_named(&mut session, &options).await.unwrap();

        assert_eq!(result.values.integer("a"), Some(1));
        assert_eq!(result.values.integer("b"), Some(2));
    }
}
