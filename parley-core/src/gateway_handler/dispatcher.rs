//! Turns invocations into executed commands.
//!
//! Every invocation moves through `Parsing → Gating → Collecting → Executing` and ends in exactly
//! one [`Outcome`]. Each outcome produces one tracing event, one metrics increment and one
//! [`Transport::report_outcome`] call. Messages that don't parse into a command end silently.

use std::any::Any;
use std::collections::HashSet;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parley_common::config::ParleyConfig;
use parley_common::err;
use parley_common::util::split_args;
use parley_string_fmt::markdown::{Markdown, disambiguation};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

use super::conversation::Conversations;
use super::message_parser::error::{ErrorSeverity, GetErrorSeverity};
use super::message_parser::parser::{ParseResult, parse_invocation};
use super::{Invocation, Transport};
use crate::command::collector::{PromptOptions, Session};
use crate::command::errors::{BlockReason, CancelReason};
use crate::command::gating::{GateCtxt, record_use, run_gates};
use crate::command::registry::{CommandRegistry, RegisteredCommand};
use crate::command::throttle::ThrottleTracker;
use crate::command::{ArgsMode, CommandArgs, CommandCtxt, CommandData};
use crate::directory::GuildDirectory;
use crate::metrics::Metrics;

/// The collaborators the engine talks to.
#[derive(Clone)]
pub struct Services {
    pub transport: Arc<dyn Transport>,
    pub directory: Arc<dyn GuildDirectory>,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub default_prefix: String,
    /// Replaces every other prefix when set.
    pub prefix_override: Option<String>,
    /// The agent's user ID, for mention prefixes. 0 disables them.
    pub agent_id: u64,
    pub owners: HashSet<Id<UserMarker>>,
    pub prompt: PromptOptions,
}
impl DispatchOptions {
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            default_prefix: config.prefix.default.clone(),
            prefix_override: config.dev.prefix_override.clone(),
            agent_id: config.agent.id,
            owners: config.dev.owners.iter().copied().filter_map(Id::new_checked).collect(),
            prompt: PromptOptions::from_config(&config.commands),
        }
    }
}
impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_config(&ParleyConfig::default())
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        command: String,
    },
    Blocked {
        command: String,
        reason: BlockReason,
    },
    Cancelled {
        command: String,
        reason: CancelReason,
    },
    /// The handler (or argument collection) returned an error or panicked.
    Errored {
        command: String,
        args: String,
        error: String,
    },
    /// The token partially matched several commands.
    Ambiguous {
        token: String,
        candidates: Vec<String>,
    },
}
impl Outcome {
    /// Metrics label and log name of the terminal state.
    pub fn state(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Blocked { .. } => "blocked",
            Self::Cancelled { .. } => "cancelled",
            Self::Errored { .. } => "errored",
            Self::Ambiguous { .. } => "ambiguous",
        }
    }

    /// What the user should be told, if anything.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Completed { .. } => None,
            Self::Blocked { command, reason } => Some(reason.notice(command)),
            Self::Cancelled { reason, .. } => Some(reason.notice().to_owned()),
            Self::Errored { command, .. } => Some(format!(
                "An error occurred while running the {} command.",
                command.codestring()
            )),
            Self::Ambiguous { candidates, .. } => Some(disambiguation(candidates, "commands")),
        }
    }
}
impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed { command } => write!(f, "{command} completed"),
            Self::Blocked { command, reason } => write!(f, "{command} blocked ({reason})"),
            Self::Cancelled { command, reason } => write!(f, "{command} cancelled ({reason})"),
            Self::Errored { command, args, error } => write!(f, "{command} failed with args {args}: {error}"),
            Self::Ambiguous { token, candidates } => {
                write!(f, "{token:?} is ambiguous ({})", candidates.join(", "))
            },
        }
    }
}

/// Input for a command, before it's turned into [`CommandArgs`].
enum RawArgs {
    Text(String),
    Named(Vec<(String, String)>),
    Captures(Vec<Option<String>>),
}

enum Collected {
    Args(CommandArgs),
    Cancelled(CancelReason),
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    services: Services,
    conversations: Conversations,
    throttles: ThrottleTracker,
    options: DispatchOptions,
    metrics: Metrics,
}
impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, services: Services, options: DispatchOptions) -> anyhow::Result<Self> {
        Ok(Self {
            registry,
            services,
            conversations: Conversations::new(),
            throttles: ThrottleTracker::new(options.owners.iter().copied()),
            options,
            metrics: Metrics::new()?,
        })
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Handles `invocation` on its own task.
    pub fn spawn(self: &Arc<Self>, invocation: Invocation) -> JoinHandle<Option<Outcome>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.handle(invocation).await })
    }

    /// Cancels every throttle timer.
    pub fn shutdown(&self) {
        self.throttles.shutdown();
    }

    /// Handles one invocation to the end. Returns `None` when the invocation was a reply to a
    /// pending prompt or didn't parse into a command.
    pub async fn handle(&self, invocation: Invocation) -> Option<Outcome> {
        if !invocation.author_is_bot
            && let Some(text) = invocation.text()
            && self
                .conversations
                .offer(invocation.author, invocation.channel_id, text)
        {
            debug!("routed message {} to a waiting prompt", invocation.message_id);
            return None;
        }

        let parsed = match parse_invocation(
            &invocation,
            &self.registry,
            &self.options,
            self.registry.settings().as_ref(),
        )
        .await
        {
            Ok(parsed) => parsed,
            Err(error) => {
                if error.get_severity() == ErrorSeverity::High {
                    err!("{error}");
                } else {
                    debug!("{error}");
                }
                return None;
            },
        };

        let outcome = self.run(&invocation, parsed).await;
        self.finish(&invocation, &outcome).await;
        Some(outcome)
    }

    async fn run(&self, invocation: &Invocation, parsed: ParseResult) -> Outcome {
        let (command, calling_prefix, raw) = match parsed {
            ParseResult::Ambiguous { token, candidates } => {
                return Outcome::Ambiguous {
                    token,
                    candidates: candidates.iter().map(|c| c.name().to_owned()).collect(),
                };
            },
            ParseResult::Command {
                command,
                args,
                calling_prefix,
            } => (command, calling_prefix, RawArgs::Text(args)),
            ParseResult::Unknown {
                command,
                token,
                calling_prefix,
            } => (command, calling_prefix, RawArgs::Text(token)),
            ParseResult::Pattern { command, captures } => (command, String::new(), RawArgs::Captures(captures)),
            ParseResult::Structured { command, options } => (command, String::new(), RawArgs::Named(options)),
        };
        let name = command.name().to_owned();

        let gate = GateCtxt {
            invocation,
            command: &command,
            registry: &self.registry,
            directory: self.services.directory.as_ref(),
            throttles: &self.throttles,
            owners: &self.options.owners,
        };
        if let Err(reason) = run_gates(&gate).await {
            return Outcome::Blocked { command: name, reason };
        }

        let args = match self.collect(invocation, &command, raw).await {
            Ok(Collected::Args(args)) => args,
            Ok(Collected::Cancelled(reason)) => return Outcome::Cancelled { command: name, reason },
            Err(e) => {
                return Outcome::Errored {
                    command: name,
                    args: "<collection failed>".to_owned(),
                    error: format!("{e:#}"),
                };
            },
        };

        record_use(&gate);

        let data = CommandData {
            invocation,
            command: &command,
            registry: &self.registry,
            services: &self.services,
            options: &self.options,
            calling_prefix,
        };
        let ctxt = CommandCtxt::new(&data);
        let args_display = args.to_string();

        match AssertUnwindSafe(command.command.execute(ctxt, args))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Outcome::Completed { command: name },
            Ok(Err(e)) => Outcome::Errored {
                command: name,
                args: args_display,
                error: format!("{e:#}"),
            },
            Err(panic) => Outcome::Errored {
                command: name,
                args: args_display,
                error: format!("panicked: {}", panic_message(panic.as_ref())),
            },
        }
    }

    /// Turns the raw input into the handler's arguments, running the prompt loop when the
    /// command declares argument specs. Pattern captures bypass collection.
    async fn collect(&self, invocation: &Invocation, command: &RegisteredCommand, raw: RawArgs) -> anyhow::Result<Collected> {
        let single_quotes = self.options.prompt.single_quotes;
        let uncollected = command.collector.is_empty();

        let result = match (raw, command.metadata.args_mode) {
            (RawArgs::Captures(captures), _) => return Ok(Collected::Args(CommandArgs::Pattern(captures))),
            (RawArgs::Text(text), ArgsMode::Single) if uncollected => {
                return Ok(Collected::Args(CommandArgs::Raw(text)));
            },
            (RawArgs::Text(text), ArgsMode::Multiple { count }) if uncollected => {
                return Ok(Collected::Args(CommandArgs::Split(split_args(&text, count, single_quotes))));
            },
            (RawArgs::Named(options), ArgsMode::Single) if uncollected => {
                let joined = options
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect::<Vec<_>>()
                    .join(" ");
                return Ok(Collected::Args(CommandArgs::Raw(joined)));
            },
            (RawArgs::Named(options), ArgsMode::Multiple { .. }) if uncollected => {
                let values = options.into_iter().map(|(_, value)| value).collect();
                return Ok(Collected::Args(CommandArgs::Split(values)));
            },
            (RawArgs::Text(text), _) => {
                let provided = split_args(&text, command.collector.split_count(), single_quotes);
                command.collector.obtain(&mut self.session(invocation), &provided).await?
            },
            (RawArgs::Named(options), _) => {
                command
                    .collector
                    .obtain_named(&mut self.session(invocation), &options)
                    .await?
            },
        };

        Ok(match result.cancelled {
            Some(reason) => Collected::Cancelled(reason),
            None => Collected::Args(CommandArgs::Parsed(result.values)),
        })
    }

    fn session<'a>(&'a self, invocation: &'a Invocation) -> Session<'a> {
        Session::new(
            invocation,
            &self.registry,
            self.services.transport.as_ref(),
            self.services.directory.as_ref(),
            &self.conversations,
            &self.options.prompt,
        )
        .with_metrics(&self.metrics)
    }

    async fn finish(&self, invocation: &Invocation, outcome: &Outcome) {
        let scope = invocation.scope();
        match outcome {
            Outcome::Completed { .. } => info!("{outcome} in {scope}"),
            Outcome::Errored { .. } => err!("Command {outcome} in {scope}"),
            _ => debug!("{outcome} in {scope}"),
        }

        self.metrics.add_invocation(outcome.state());

        if let Err(e) = self.services.transport.report_outcome(invocation, outcome).await {
            warn!("Failed to report outcome of {} in {scope}: {e:#}", invocation.message_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::CommandBuilder;
    use crate::command::arguments::ArgumentBuilder;
    use crate::command::registry::EnablementTarget;
    use crate::gateway_handler::InvocationContent;
    use crate::testing::{
        AUTHOR, Behaviour, CHANNEL, GUILD, MockDirectory, MockTransport, TestCommand, invocation, registry_with_ping,
    };

    fn dispatcher(registry: CommandRegistry, transport: Arc<MockTransport>) -> Dispatcher {
        let services = Services {
            transport,
            directory: Arc::new(MockDirectory::default()),
        };
        Dispatcher::new(Arc::new(registry), services, DispatchOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn completed_invocations_are_reported_once() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry_with_ping(), transport.clone());

        let outcome = dispatcher.handle(invocation("!ping")).await;
        assert_eq!(
            outcome,
            Some(Outcome::Completed {
                command: "ping".to_owned()
            })
        );
        assert_eq!(transport.outcomes(), vec!["completed"]);
        assert_eq!(transport.messages(), vec!["ok"]);
        assert_eq!(dispatcher.metrics().invocation_count("completed"), 1);

        // plain chatter is not an invocation
        assert_eq!(dispatcher.handle(invocation("hello")).await, None);
        assert_eq!(transport.outcomes().len(), 1);
    }

    #[tokio::test]
    async fn ambiguous_tokens_list_candidates() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry_with_ping(), transport.clone());

        let outcome = dispatcher.handle(invocation("!pin")).await.unwrap();
        assert_eq!(outcome.state(), "ambiguous");
        assert_eq!(
            transport.messages(),
            vec!["Multiple commands found, please be more specific: `ping`, `pingall`"]
        );
    }

    #[tokio::test]
    async fn blocked_invocations_never_run() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(CommandBuilder::new("secret", "test").build()));
        registry.register_command(command.clone()).unwrap();
        registry
            .set_enabled(&EnablementTarget::Group("test".to_owned()), Some(GUILD), false)
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry, transport.clone());

        let outcome = dispatcher.handle(invocation("!secret")).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Blocked {
                command: "secret".to_owned(),
                reason: BlockReason::Disabled
            }
        );
        assert!(command.calls().is_empty());
        assert_eq!(transport.messages(), vec!["The `secret` command is disabled."]);
    }

    #[tokio::test]
    async fn handler_errors_and_panics_are_contained() {
        let registry = registry_with_ping();
        registry
            .register_command(Arc::new(
                TestCommand::new(CommandBuilder::new("broken", "test").build()).behaving(Behaviour::Fail),
            ))
            .unwrap();
        registry
            .register_command(Arc::new(
                TestCommand::new(CommandBuilder::new("explode", "test").build()).behaving(Behaviour::Panic),
            ))
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry, transport.clone());

        let outcome = dispatcher.handle(invocation("!broken")).await.unwrap();
        assert!(matches!(outcome, Outcome::Errored { ref error, .. } if error == "handler failed"));

        let outcome = dispatcher.handle(invocation("!explode")).await.unwrap();
        assert!(matches!(outcome, Outcome::Errored { ref error, .. } if error.contains("handler panicked")));

        // the dispatcher keeps working
        assert_eq!(dispatcher.handle(invocation("!ping")).await.unwrap().state(), "completed");
        assert_eq!(dispatcher.metrics().invocation_count("errored"), 2);
        assert_eq!(transport.outcomes(), vec!["errored", "errored", "completed"]);
    }

    #[tokio::test]
    async fn patterns_bypass_collection() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(
            CommandBuilder::new("dice", "test")
                .patterns([r"^(\d+)d(\d+)$"])
                .arguments([ArgumentBuilder::new("sides").types(["integer"]).build()])
                .build(),
        ));
        registry.register_command(command.clone()).unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry, transport.clone());

        assert_eq!(dispatcher.handle(invocation("3d8")).await.unwrap().state(), "completed");
        match &command.calls()[..] {
            [CommandArgs::Pattern(captures)] => assert_eq!(captures[2].as_deref(), Some("8")),
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn unspecified_arguments_follow_the_args_mode() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(
            CommandBuilder::new("split", "test")
                .args_mode(ArgsMode::Multiple { count: Some(2) })
                .build(),
        ));
        registry.register_command(command.clone()).unwrap();

        let dispatcher = dispatcher(registry, Arc::new(MockTransport::new()));
        dispatcher.handle(invocation("!split \"a b\" c  d")).await.unwrap();

        match &command.calls()[..] {
            [CommandArgs::Split(values)] => assert_eq!(values, &["a b", "c  d"]),
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn replies_reach_the_waiting_invocation() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(
            CommandBuilder::new("double", "test")
                .arguments([ArgumentBuilder::new("n").types(["integer"]).build()])
                .build(),
        ));
        registry.register_command(command.clone()).unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = Arc::new(dispatcher(registry, transport.clone()));

        let running = dispatcher.spawn(invocation("!double"));
        while !dispatcher.conversations().is_pending(AUTHOR, CHANNEL) {
            tokio::task::yield_now().await;
        }

        // the reply is consumed by the prompt, not dispatched
        assert_eq!(dispatcher.handle(invocation("21")).await, None);

        let outcome = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.unwrap().state(), "completed");
        assert_eq!(command.calls()[0].parsed().unwrap().integer("n"), Some(21));
        assert_eq!(dispatcher.metrics().invocation_count("completed"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_prompts_cancel() {
        let registry = registry_with_ping();
        registry
            .register_command(Arc::new(TestCommand::new(
                CommandBuilder::new("double", "test")
                    .arguments([ArgumentBuilder::new("n").types(["integer"]).build()])
                    .build(),
            )))
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry, transport.clone());

        let outcome = dispatcher.handle(invocation("!double")).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Cancelled {
                command: "double".to_owned(),
                reason: CancelReason::Time
            }
        );
        assert_eq!(transport.outcomes(), vec!["cancelled"]);
        assert_eq!(dispatcher.metrics().prompts.get(), 1);
    }

    #[tokio::test]
    async fn structured_invocations_match_options_by_key() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(
            CommandBuilder::new("add", "test")
                .arguments([
                    ArgumentBuilder::new("a").types(["integer"]).build(),
                    ArgumentBuilder::new("b").types(["integer"]).build(),
                ])
                .build(),
        ));
        registry.register_command(command.clone()).unwrap();

        let dispatcher = dispatcher(registry, Arc::new(MockTransport::new()));
        let mut inv = invocation("");
        inv.content = InvocationContent::Structured {
            command: "add".to_owned(),
            options: vec![("b".to_owned(), "2".to_owned()), ("a".to_owned(), "1".to_owned())],
        };

        assert_eq!(dispatcher.handle(inv).await.unwrap().state(), "completed");
        let calls = command.calls();
        let values = calls[0].parsed().unwrap();
        assert_eq!((values.integer("a"), values.integer("b")), (Some(1), Some(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn only_runs_count_towards_throttling() {
        let registry = registry_with_ping();
        let command = Arc::new(TestCommand::new(
            CommandBuilder::new("double", "test")
                .throttling(1, 600)
                .arguments([ArgumentBuilder::new("n").types(["integer"]).build()])
                .build(),
        ));
        registry.register_command(command.clone()).unwrap();

        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(registry, transport.clone());

        // an abandoned prompt leaves the window untouched
        assert_eq!(dispatcher.handle(invocation("!double")).await.unwrap().state(), "cancelled");
        assert_eq!(dispatcher.handle(invocation("!double 3")).await.unwrap().state(), "completed");

        let outcome = dispatcher.handle(invocation("!double 4")).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Blocked {
                reason: BlockReason::Throttled(_),
                ..
            }
        ));
        assert_eq!(command.calls().len(), 1);
    }

    #[tokio::test]
    async fn raw_input_reaches_commands_without_specs() {
        let registry = registry_with_ping();
        let dice = Arc::new(TestCommand::new(
            CommandBuilder::new("dice", "test").patterns([r"^(\d+)d(\d+)$"]).build(),
        ));
        let echo = Arc::new(TestCommand::new(CommandBuilder::new("echo", "test").build()));
        registry.register_command(dice.clone()).unwrap();
        registry.register_command(echo.clone()).unwrap();

        let dispatcher = dispatcher(registry, Arc::new(MockTransport::new()));
        dispatcher.handle(invocation("2d6")).await.unwrap();
        match &dice.calls()[..] {
            [CommandArgs::Pattern(captures)] => assert_eq!(captures[1].as_deref(), Some("2")),
            other => panic!("unexpected calls {other:?}"),
        }

        let mut inv = invocation("");
        inv.content = InvocationContent::Structured {
            command: "echo".to_owned(),
            options: vec![("a".to_owned(), "hello".to_owned()), ("b".to_owned(), "there".to_owned())],
        };
        dispatcher.handle(inv).await.unwrap();
        match &echo.calls()[..] {
            [CommandArgs::Raw(text)] => assert_eq!(text, "hello there"),
            other => panic!("unexpected calls {other:?}"),
        }
    }
}
