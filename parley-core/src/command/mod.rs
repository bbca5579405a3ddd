//! The command system.
//!
//! The key things that make up the command system are:
//!
//! - The [`Command`] trait: defines [`Command::metadata`], read once at registration, and
//!   [`Command::execute`], which runs the actual command once every argument is collected.
//!
//!   This is used as a trait object ([`TCommand`]), because it is stored along with all other
//!   commands in the registry.
//!
//! - The type system in [`types`]: maps type IDs to coercion strategies. Arguments
//!   ([`arguments`]) name their types by ID and the [`collector`] runs them through the
//!   interactive prompt loop.
//!
//! - The registry ([`registry::CommandRegistry`]): stores every group and command, resolves a
//!   token to a command and tracks enablement.
//!
//! - Gating ([`gating`]) and throttling ([`throttle`]): the checks an invocation must pass before
//!   its arguments are collected.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

use self::arguments::ArgumentSpec;
use self::messagebuilder::MessageBuilder;
use self::registry::{CommandRegistry, RegisteredCommand};
use self::throttle::Throttling;
use self::types::ArgValues;
use crate::gateway_handler::dispatcher::{DispatchOptions, Services};
use crate::gateway_handler::reply::send_with_fallback;
use crate::gateway_handler::{Invocation, ReplyTarget, ResponseHandle};

pub mod arguments;
pub mod builtin;
pub mod collector;
pub mod errors;
pub mod gating;
pub mod group;
pub mod messagebuilder;
pub mod misc;
pub mod registry;
pub mod throttle;
pub mod types;

/// How a command without argument specs receives its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgsMode {
    /// Everything after the command name, as one string.
    Single,
    /// Split on whitespace (respecting quotes) into at most `count` values.
    Multiple { count: Option<usize> },
}

#[derive(Clone, Debug)]
pub struct CommandMetadata {
    pub name: String,
    pub aliases: Vec<String>,
    /// ID of the owning group.
    pub group: String,
    /// Name within the group. Defaults to `name`.
    pub member_name: Option<String>,
    pub description: String,
    pub details: Option<String>,
    /// Usage string shown by help instead of one generated from the arguments.
    pub format: Option<String>,
    pub examples: Vec<String>,
    pub guild_only: bool,
    pub dm_only: bool,
    pub owner_only: bool,
    pub nsfw: bool,
    /// Permissions the invoking user needs in the channel.
    pub user_permissions: Permissions,
    /// Permissions the agent needs in the channel.
    pub client_permissions: Permissions,
    pub throttling: Option<Throttling>,
    pub guarded: bool,
    pub default_enabled: bool,
    /// Hidden commands are left out of help listings.
    pub hidden: bool,
    /// Marks the fallback run for prefixed tokens that name no command.
    pub unknown: bool,
    /// When `false`, the command is only reachable through its patterns.
    pub default_handling: bool,
    pub patterns: Vec<String>,
    pub arguments: Vec<ArgumentSpec>,
    pub args_mode: ArgsMode,
    /// Overrides the prompt limit for this command's arguments.
    pub args_prompt_limit: Option<u32>,
}

pub struct CommandBuilder {
    metadata: CommandMetadata,
}
impl CommandBuilder {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            metadata: CommandMetadata {
                name: name.into(),
                aliases: vec![],
                group: group.into(),
                member_name: None,
                description: String::new(),
                details: None,
                format: None,
                examples: vec![],
                guild_only: false,
                dm_only: false,
                owner_only: false,
                nsfw: false,
                user_permissions: Permissions::empty(),
                client_permissions: Permissions::empty(),
                throttling: None,
                guarded: false,
                default_enabled: true,
                hidden: false,
                unknown: false,
                default_handling: true,
                patterns: vec![],
                arguments: vec![],
                args_mode: ArgsMode::Single,
                args_prompt_limit: None,
            },
        }
    }

    pub fn aliases<I, S>(&mut self, aliases: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn member_name(&mut self, member_name: impl Into<String>) -> &mut Self {
        self.metadata.member_name = Some(member_name.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.metadata.description = description.into();
        self
    }

    pub fn details(&mut self, details: impl Into<String>) -> &mut Self {
        self.metadata.details = Some(details.into());
        self
    }

    pub fn format(&mut self, format: impl Into<String>) -> &mut Self {
        self.metadata.format = Some(format.into());
        self
    }

    pub fn examples<I, S>(&mut self, examples: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn guild_only(&mut self, guild_only: bool) -> &mut Self {
        self.metadata.guild_only = guild_only;
        self
    }

    pub fn dm_only(&mut self, dm_only: bool) -> &mut Self {
        self.metadata.dm_only = dm_only;
        self
    }

    pub fn owner_only(&mut self, owner_only: bool) -> &mut Self {
        self.metadata.owner_only = owner_only;
        self
    }

    pub fn nsfw(&mut self, nsfw: bool) -> &mut Self {
        self.metadata.nsfw = nsfw;
        self
    }

    pub fn user_permissions(&mut self, permissions: Permissions) -> &mut Self {
        self.metadata.user_permissions = permissions;
        self
    }

    pub fn client_permissions(&mut self, permissions: Permissions) -> &mut Self {
        self.metadata.client_permissions = permissions;
        self
    }

    pub fn throttling(&mut self, usages: u32, duration_secs: u64) -> &mut Self {
        self.metadata.throttling = Some(Throttling::new(usages, duration_secs));
        self
    }

    pub fn guarded(&mut self, guarded: bool) -> &mut Self {
        self.metadata.guarded = guarded;
        self
    }

    pub fn default_enabled(&mut self, enabled: bool) -> &mut Self {
        self.metadata.default_enabled = enabled;
        self
    }

    pub fn hidden(&mut self, hidden: bool) -> &mut Self {
        self.metadata.hidden = hidden;
        self
    }

    pub fn unknown(&mut self, unknown: bool) -> &mut Self {
        self.metadata.unknown = unknown;
        self
    }

    pub fn default_handling(&mut self, default_handling: bool) -> &mut Self {
        self.metadata.default_handling = default_handling;
        self
    }

    pub fn patterns<I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn arguments(&mut self, arguments: impl IntoIterator<Item = ArgumentSpec>) -> &mut Self {
        self.metadata.arguments = arguments.into_iter().collect();
        self
    }

    pub fn args_mode(&mut self, mode: ArgsMode) -> &mut Self {
        self.metadata.args_mode = mode;
        self
    }

    pub fn args_prompt_limit(&mut self, limit: u32) -> &mut Self {
        self.metadata.args_prompt_limit = Some(limit);
        self
    }

    pub fn build(&self) -> CommandMetadata {
        self.metadata.clone()
    }
}

/// What a command's handler receives.
#[derive(Clone, Debug)]
pub enum CommandArgs {
    /// Collected values, keyed by argument key.
    Parsed(ArgValues),
    /// The raw remainder, for commands without argument specs in [`ArgsMode::Single`].
    Raw(String),
    /// Split values, for commands without argument specs in [`ArgsMode::Multiple`].
    Split(Vec<String>),
    /// Capture groups of the pattern that matched. Index 0 is the whole match.
    Pattern(Vec<Option<String>>),
}
impl CommandArgs {
    pub fn parsed(&self) -> Option<&ArgValues> {
        if let Self::Parsed(values) = self { Some(values) } else { None }
    }
}
impl Display for CommandArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsed(values) => write!(f, "{values}"),
            Self::Raw(raw) => write!(f, "{raw:?}"),
            Self::Split(values) => write!(f, "{values:?}"),
            Self::Pattern(captures) => write!(f, "pattern {captures:?}"),
        }
    }
}

/// A command that can be executed.
// This trait is used as a trait object and AFIT makes traits not object safe, so we still need
// #[async_trait] here :(
#[async_trait]
pub trait Command {
    /// Returns the command's metadata. Read once, when the command is registered.
    fn metadata(&self) -> CommandMetadata;

    /// Runs the command. Errors are logged and reported to the user as a generic failure.
    async fn execute(&self, ctxt: CommandCtxt<'_>, args: CommandArgs) -> anyhow::Result<()>;
}

/// Just a type alias for a command as a trait object with other necessary bounds.
/// See [Command] for more documentation.
pub type TCommand = Arc<dyn Command + Send + Sync>;

/// Everything a running command can see.
pub struct CommandData<'a> {
    pub invocation: &'a Invocation,
    pub command: &'a Arc<RegisteredCommand>,
    pub registry: &'a Arc<CommandRegistry>,
    pub services: &'a Services,
    pub options: &'a DispatchOptions,
    /// The prefix the invocation used. Empty for prefixless, pattern and structured invocations.
    pub calling_prefix: String,
}

#[derive(Clone, Copy)]
pub struct CommandCtxt<'a> {
    pub data: &'a CommandData<'a>,
}

impl<'a> CommandCtxt<'a> {
    pub fn new(data: &'a CommandData<'a>) -> Self {
        Self { data }
    }

    /// Replies in the invocation's channel.
    pub async fn reply(&self, builder: impl Into<MessageBuilder>) -> anyhow::Result<ResponseHandle> {
        self.data
            .services
            .transport
            .send(ReplyTarget::Channel(self.channel_id()), builder.into())
            .await
    }

    /// Sends to the author directly. Falls back to the invocation's channel if that fails.
    pub async fn direct(&self, builder: impl Into<MessageBuilder>) -> anyhow::Result<ResponseHandle> {
        if self.data.invocation.is_direct() {
            return self.reply(builder).await;
        }

        send_with_fallback(
            self.data.services.transport.as_ref(),
            ReplyTarget::User(self.author()),
            ReplyTarget::Channel(self.channel_id()),
            builder,
            "Unable to send you a direct message, you probably have them disabled.",
        )
        .await
    }

    pub fn author(&self) -> Id<UserMarker> {
        self.data.invocation.author
    }

    pub fn channel_id(&self) -> Id<ChannelMarker> {
        self.data.invocation.channel_id
    }

    pub fn guild_id(&self) -> Option<Id<GuildMarker>> {
        self.data.invocation.guild_id
    }

    pub fn registry(&self) -> &'a Arc<CommandRegistry> {
        self.data.registry
    }

    pub fn command(&self) -> &'a Arc<RegisteredCommand> {
        self.data.command
    }

    pub fn is_owner(&self) -> bool {
        self.data.options.owners.contains(&self.author())
    }

    /// How users should call `command` here, e.g. `` `!ping` `` or `` `ping` `` in DMs.
    pub fn usage_prefix(&self) -> String {
        if self.data.invocation.is_direct() {
            String::new()
        } else if self.data.calling_prefix.is_empty() {
            self.data.options.default_prefix.clone()
        } else {
            self.data.calling_prefix.clone()
        }
    }
}
