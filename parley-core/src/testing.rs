//! Mocks shared by the unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

use crate::command::group::CommandGroup;
use crate::command::messagebuilder::MessageBuilder;
use crate::command::registry::CommandRegistry;
use crate::command::{Command, CommandArgs, CommandBuilder, CommandCtxt, CommandMetadata};
use crate::directory::{Actor, GuildDirectory};
use crate::gateway_handler::conversation::Conversations;
use crate::gateway_handler::dispatcher::Outcome;
use crate::gateway_handler::{Invocation, InvocationContent, ReplyTarget, ResponseHandle, Transport};
use crate::settings::MemorySettings;

pub const AUTHOR: Id<UserMarker> = Id::new(1000);
pub const CHANNEL: Id<ChannelMarker> = Id::new(2000);
pub const GUILD: Id<GuildMarker> = Id::new(3000);

/// A guild text message from [`AUTHOR`] in [`CHANNEL`].
pub fn invocation(text: &str) -> Invocation {
    Invocation {
        message_id: 1,
        author: AUTHOR,
        author_is_bot: false,
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        channel_nsfw: false,
        content: InvocationContent::Text(text.to_owned()),
    }
}

/// Group `test` with the commands `ping` and `pingall`.
pub fn registry_with_ping() -> CommandRegistry {
    let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
    registry.register_group(CommandGroup::new("test", "Test")).unwrap();
    registry
        .register_command(Arc::new(TestCommand::new(
            CommandBuilder::new("ping", "test").description("Pong.").build(),
        )))
        .unwrap();
    registry
        .register_command(Arc::new(TestCommand::new(
            CommandBuilder::new("pingall", "test").description("Pong, loudly.").build(),
        )))
        .unwrap();
    registry
}

pub struct MockDirectory {
    members: HashSet<u64>,
    channels: HashSet<u64>,
    roles: HashSet<u64>,
    user_permissions: Permissions,
    agent_permissions: Permissions,
    failing: bool,
}
impl Default for MockDirectory {
    fn default() -> Self {
        Self {
            members: HashSet::new(),
            channels: HashSet::new(),
            roles: HashSet::new(),
            user_permissions: Permissions::all(),
            agent_permissions: Permissions::all(),
            failing: false,
        }
    }
}
impl MockDirectory {
    pub fn with_member(mut self, id: u64) -> Self {
        self.members.insert(id);
        self
    }

    pub fn with_channel(mut self, id: u64) -> Self {
        self.channels.insert(id);
        self
    }

    pub fn with_role(mut self, id: u64) -> Self {
        self.roles.insert(id);
        self
    }

    pub fn with_user_permissions(mut self, permissions: Permissions) -> Self {
        self.user_permissions = permissions;
        self
    }

    pub fn with_agent_permissions(mut self, permissions: Permissions) -> Self {
        self.agent_permissions = permissions;
        self
    }

    /// Every lookup fails.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing {
            bail!("directory unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl GuildDirectory for MockDirectory {
    async fn permissions(&self, actor: Actor, _: Id<GuildMarker>, _: Id<ChannelMarker>) -> anyhow::Result<Permissions> {
        self.check()?;
        Ok(match actor {
            Actor::User(_) => self.user_permissions,
            Actor::Agent => self.agent_permissions,
        })
    }

    async fn member_exists(&self, _: Id<GuildMarker>, user_id: Id<UserMarker>) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.members.contains(&user_id.get()))
    }

    async fn channel_exists(&self, _: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.channels.contains(&channel_id.get()))
    }

    async fn role_exists(&self, _: Id<GuildMarker>, role_id: Id<RoleMarker>) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.roles.contains(&role_id.get()))
    }
}

/// Records everything sent. When built with [`MockTransport::replying`], the queued replies are
/// handed to the conversation of [`AUTHOR`] in [`CHANNEL`] as soon as one is waiting.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(ReplyTarget, String)>>,
    outcomes: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<String>>,
    conversations: Option<Conversations>,
    fail_direct: bool,
    next_id: AtomicU64,
}
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying<'a>(mut self, conversations: &Conversations, replies: impl IntoIterator<Item = &'a str>) -> Self {
        self.conversations = Some(conversations.clone());
        self.replies = Mutex::new(replies.into_iter().map(str::to_owned).collect());
        self
    }

    /// Direct messages fail to send.
    pub fn failing_direct(mut self) -> Self {
        self.fail_direct = true;
        self
    }

    pub fn sent(&self) -> Vec<(ReplyTarget, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, content)| content).collect()
    }

    /// States of every reported outcome, in order.
    pub fn outcomes(&self) -> Vec<String> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, target: ReplyTarget, message: MessageBuilder) -> anyhow::Result<ResponseHandle> {
        if self.fail_direct && matches!(target, ReplyTarget::User(_)) {
            bail!("cannot send messages to this user");
        }

        self.sent.lock().unwrap().push((target, message.trimmed_content()));

        if let Some(conversations) = &self.conversations
            && conversations.is_pending(AUTHOR, CHANNEL)
        {
            let replies = self.replies.lock().unwrap().drain(..).collect::<Vec<_>>();
            for reply in replies {
                conversations.offer(AUTHOR, CHANNEL, &reply);
            }
        }

        Ok(ResponseHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            target,
        })
    }

    async fn report_outcome(&self, invocation: &Invocation, outcome: &Outcome) -> anyhow::Result<()> {
        self.outcomes.lock().unwrap().push(outcome.state().to_owned());
        if let Some(notice) = outcome.notice() {
            self.send(ReplyTarget::Channel(invocation.channel_id), notice.into())
                .await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Reply,
    Fail,
    Panic,
}

/// Replies `ok` and records the arguments of every call.
pub struct TestCommand {
    metadata: CommandMetadata,
    behaviour: Behaviour,
    calls: Mutex<Vec<CommandArgs>>,
}
impl TestCommand {
    pub fn new(metadata: CommandMetadata) -> Self {
        Self {
            metadata,
            behaviour: Behaviour::Reply,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn behaving(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn calls(&self) -> Vec<CommandArgs> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Command for TestCommand {
    fn metadata(&self) -> CommandMetadata {
        self.metadata.clone()
    }

    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(args);
        match self.behaviour {
            Behaviour::Reply => {
                ctxt.reply("ok").await?;
                Ok(())
            },
            Behaviour::Fail => bail!("handler failed"),
            Behaviour::Panic => panic!("handler panicked"),
        }
    }
}
