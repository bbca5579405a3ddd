use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use parley_common::util::format_duration;
use parley_string_fmt::Markdown;
use twilight_model::guild::Permissions;

use super::registry::RegisteredCommand;

/// An invalid command, group, argument or type registration. Always raised while registering,
/// never while dispatching.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    InvalidName(String),
    DuplicateGroup(String),
    UnknownGroup { command: String, group: String },
    NameConflict { command: String, name: String },
    DuplicateUnknownCommand { existing: String },
    EmptyArgumentTypes { command: String, argument: String },
    UnknownArgumentType { command: String, argument: String, type_id: String },
    DuplicateArgumentKey { command: String, key: String },
    RequiredAfterInfinite { command: String, argument: String },
    InvalidPattern { command: String, pattern: String, error: String },
    DuplicateType(String),
    IdentityChanged { command: String },
    NotRegistered(String),
}
impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid name {name:?}: names must be lowercase and contain no whitespace"),
            Self::DuplicateGroup(id) => write!(f, "a group with the ID {id:?} is already registered"),
            Self::UnknownGroup { command, group } => {
                write!(f, "command {command:?} references unknown group {group:?}")
            },
            Self::NameConflict { command, name } => {
                write!(f, "command {command:?} uses the name or alias {name:?}, which is already registered")
            },
            Self::DuplicateUnknownCommand { existing } => {
                write!(f, "an unknown-command fallback is already registered ({existing:?})")
            },
            Self::EmptyArgumentTypes { command, argument } => {
                write!(f, "argument {argument:?} of command {command:?} declares no type")
            },
            Self::UnknownArgumentType { command, argument, type_id } => write!(
                f,
                "argument {argument:?} of command {command:?} uses unknown type {type_id:?}"
            ),
            Self::DuplicateArgumentKey { command, key } => {
                write!(f, "command {command:?} declares the argument key {key:?} more than once")
            },
            Self::RequiredAfterInfinite { command, argument } => write!(
                f,
                "argument {argument:?} of command {command:?} is required but follows an infinite argument"
            ),
            Self::InvalidPattern { command, pattern, error } => {
                write!(f, "pattern {pattern:?} of command {command:?} is invalid: {error}")
            },
            Self::DuplicateType(id) => write!(f, "an argument type with the ID {id:?} is already registered"),
            Self::IdentityChanged { command } => write!(
                f,
                "command {command:?} cannot be reregistered with a different name, group or member name"
            ),
            Self::NotRegistered(name) => write!(f, "command {name:?} is not registered"),
        }
    }
}
impl std::error::Error for ConfigurationError {}

/// Failures of the enablement policy API.
#[derive(Debug)]
pub enum RegistryError {
    UnknownTarget(String),
    /// The target is guarded and cannot be disabled.
    Guarded(String),
    Settings(anyhow::Error),
}
impl Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTarget(name) => write!(f, "no command or group named {name:?}"),
            Self::Guarded(name) => write!(f, "{name:?} is guarded and cannot be disabled"),
            Self::Settings(err) => write!(f, "failed to store enablement: {err:#}"),
        }
    }
}
impl std::error::Error for RegistryError {}

/// Why a token could not be turned into exactly one command.
#[derive(Debug)]
pub enum ResolveError {
    NotFound,
    /// More than one command partially matched. Candidates are in registration order.
    Ambiguous(Vec<Arc<RegisteredCommand>>),
}
impl ResolveError {
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::NotFound => vec![],
            Self::Ambiguous(commands) => commands.iter().map(|c| c.name().to_owned()).collect(),
        }
    }
}
impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no matching command"),
            Self::Ambiguous(_) => write!(f, "ambiguous command: {}", self.candidates().join(", ")),
        }
    }
}
impl std::error::Error for ResolveError {}

/// Why an argument collection stopped before every argument was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The user replied with the cancel token.
    User,
    /// No reply arrived within the argument's wait time.
    Time,
    /// Too many invalid replies.
    PromptLimit,
}
impl CancelReason {
    pub fn notice(&self) -> &'static str {
        match self {
            Self::User => "Cancelled command.",
            Self::Time => "Cancelled command: no reply was received in time.",
            Self::PromptLimit => "Cancelled command: too many invalid replies.",
        }
    }
}
impl Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Time => "time",
            Self::PromptLimit => "promptLimit",
        })
    }
}

/// The first gating check an invocation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    Disabled,
    GuildOnly,
    DirectOnly,
    Nsfw,
    OwnerOnly,
    /// Permissions the invoking user is missing.
    UserPermissions(Permissions),
    /// Permissions the acting agent is missing.
    ClientPermissions(Permissions),
    /// Time left until the throttle window resets.
    Throttled(Duration),
}
impl BlockReason {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::GuildOnly => "guildOnly",
            Self::DirectOnly => "dmOnly",
            Self::Nsfw => "nsfw",
            Self::OwnerOnly => "ownerOnly",
            Self::UserPermissions(_) => "userPermissions",
            Self::ClientPermissions(_) => "clientPermissions",
            Self::Throttled(_) => "throttling",
        }
    }

    pub fn notice(&self, command: &str) -> String {
        let command = command.codestring();
        match self {
            Self::Disabled => format!("The {command} command is disabled."),
            Self::GuildOnly => format!("The {command} command must be used in a server channel."),
            Self::DirectOnly => format!("The {command} command can only be used in direct messages."),
            Self::Nsfw => format!("The {command} command can only be used in NSFW channels."),
            Self::OwnerOnly => format!("The {command} command can only be used by the bot owner."),
            Self::UserPermissions(missing) => format!(
                "The {command} command requires you to have the following permissions: {}",
                permission_names(*missing).join(", ")
            ),
            Self::ClientPermissions(missing) => format!(
                "I need the following permissions for the {command} command to work: {}",
                permission_names(*missing).join(", ")
            ),
            Self::Throttled(remaining) => format!(
                "You may not use the {command} command again for another {}.",
                format_duration(remaining)
            ),
        }
    }
}
impl Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Human readable names, e.g. `MANAGE_GUILD` becomes `Manage Guild`.
pub fn permission_names(permissions: Permissions) -> Vec<String> {
    permissions
        .iter_names()
        .map(|(name, _)| {
            name.split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
