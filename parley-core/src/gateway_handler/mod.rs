//! Everything between a transport and the command system: the inbound invocation model, the
//! [`Transport`] trait replies go through, conversation routing for prompts, message parsing and
//! the [`dispatcher::Dispatcher`].

use std::fmt::Display;

use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

use self::dispatcher::Outcome;
use crate::command::messagebuilder::MessageBuilder;

pub mod conversation;
pub mod dispatcher;
pub mod message_parser;
pub mod reply;

/// What the user sent.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationContent {
    /// A plain chat message that may contain a prefixed command.
    Text(String),
    /// An already structured call: a command name plus named options keyed by argument key.
    Structured { command: String, options: Vec<(String, String)> },
}

/// One inbound event from a transport.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub message_id: u64,
    pub author: Id<UserMarker>,
    pub author_is_bot: bool,
    pub channel_id: Id<ChannelMarker>,
    /// `None` in direct messages.
    pub guild_id: Option<Id<GuildMarker>>,
    pub channel_nsfw: bool,
    pub content: InvocationContent,
}
impl Invocation {
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }

    /// The raw text of a text invocation.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            InvocationContent::Text(text) => Some(text),
            InvocationContent::Structured { .. } => None,
        }
    }

    /// Short description of where this invocation happened, for logs.
    pub fn scope(&self) -> String {
        match self.guild_id {
            Some(guild_id) => format!("guild {guild_id} channel {}", self.channel_id),
            None => format!("dm {}", self.channel_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTarget {
    Channel(Id<ChannelMarker>),
    /// Direct message to a user.
    User(Id<UserMarker>),
}
impl Display for ReplyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel {id}"),
            Self::User(id) => write!(f, "user {id}"),
        }
    }
}

/// A message the transport has sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHandle {
    pub id: u64,
    pub target: ReplyTarget,
}

/// The transport the engine replies through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, target: ReplyTarget, message: MessageBuilder) -> anyhow::Result<ResponseHandle>;

    /// Called exactly once per finished invocation. By default, sends the outcome's notice (if
    /// any) to the invocation's channel.
    async fn report_outcome(&self, invocation: &Invocation, outcome: &Outcome) -> anyhow::Result<()> {
        if let Some(notice) = outcome.notice() {
            self.send(ReplyTarget::Channel(invocation.channel_id), notice.into())
                .await?;
        }
        Ok(())
    }
}
