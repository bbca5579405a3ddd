//! The checks an invocation must pass before its arguments are collected.
//!
//! Gates run in the order of [`GATES`]. The first one that fails decides the [`BlockReason`].
//! Collaborator failures (settings or directory lookups) block the invocation.

use std::collections::HashSet;
use std::fmt::Display;

use tracing::warn;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

use super::errors::BlockReason;
use super::registry::{CommandRegistry, RegisteredCommand};
use super::throttle::ThrottleTracker;
use crate::directory::{Actor, GuildDirectory, missing_permissions};
use crate::gateway_handler::Invocation;

pub struct GateCtxt<'a> {
    pub invocation: &'a Invocation,
    pub command: &'a RegisteredCommand,
    pub registry: &'a CommandRegistry,
    pub directory: &'a dyn GuildDirectory,
    pub throttles: &'a ThrottleTracker,
    pub owners: &'a HashSet<Id<UserMarker>>,
}
impl GateCtxt<'_> {
    fn is_owner(&self) -> bool {
        self.owners.contains(&self.invocation.author)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Enablement,
    ScopeRestriction,
    Ownership,
    Permissions,
    Throttle,
}
impl Gate {
    pub async fn check(&self, cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
        match self {
            Self::Enablement => check_enablement(cx).await,
            Self::ScopeRestriction => check_scope(cx),
            Self::Ownership => check_ownership(cx),
            Self::Permissions => check_permissions(cx).await,
            Self::Throttle => check_throttle(cx),
        }
    }
}
impl Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Enablement => "enablement",
            Self::ScopeRestriction => "scope",
            Self::Ownership => "ownership",
            Self::Permissions => "permissions",
            Self::Throttle => "throttle",
        })
    }
}

pub const GATES: [Gate; 5] = [
    Gate::Enablement,
    Gate::ScopeRestriction,
    Gate::Ownership,
    Gate::Permissions,
    Gate::Throttle,
];

pub async fn run_gates(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    for gate in GATES {
        gate.check(cx).await?;
    }
    Ok(())
}

pub async fn check_enablement(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    match cx.registry.is_enabled(cx.command, cx.invocation.guild_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(BlockReason::Disabled),
        Err(e) => {
            warn!("Failed to look up enablement of {}: {e:#}", cx.command.name());
            Err(BlockReason::Disabled)
        },
    }
}

pub fn check_scope(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    let metadata = &cx.command.metadata;
    let direct = cx.invocation.is_direct();

    if metadata.guild_only && direct {
        Err(BlockReason::GuildOnly)
    } else if metadata.dm_only && !direct {
        Err(BlockReason::DirectOnly)
    } else if metadata.nsfw && !cx.invocation.channel_nsfw {
        Err(BlockReason::Nsfw)
    } else {
        Ok(())
    }
}

pub fn check_ownership(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    if cx.command.metadata.owner_only && !cx.is_owner() {
        Err(BlockReason::OwnerOnly)
    } else {
        Ok(())
    }
}

async fn missing(cx: &GateCtxt<'_>, actor: Actor, required: Permissions) -> Permissions {
    let Some(guild_id) = cx.invocation.guild_id else {
        return Permissions::empty();
    };
    if required.is_empty() {
        return required;
    }

    match cx.directory.permissions(actor, guild_id, cx.invocation.channel_id).await {
        Ok(granted) => missing_permissions(granted, required),
        Err(e) => {
            warn!("Failed to fetch permissions of {actor:?} in {guild_id}: {e:#}");
            required
        },
    }
}

/// Only applies in guilds. Owners skip the user check but not the agent check.
pub async fn check_permissions(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    let metadata = &cx.command.metadata;

    if !cx.is_owner() {
        let missing_user = missing(cx, Actor::User(cx.invocation.author), metadata.user_permissions).await;
        if !missing_user.is_empty() {
            return Err(BlockReason::UserPermissions(missing_user));
        }
    }

    let missing_agent = missing(cx, Actor::Agent, metadata.client_permissions).await;
    if !missing_agent.is_empty() {
        return Err(BlockReason::ClientPermissions(missing_agent));
    }

    Ok(())
}

/// Read-only: a use is only counted by [`record_use`], once the command actually runs.
pub fn check_throttle(cx: &GateCtxt<'_>) -> Result<(), BlockReason> {
    let Some(throttling) = &cx.command.metadata.throttling else {
        return Ok(());
    };

    let check = cx
        .throttles
        .check(cx.command.name(), throttling, cx.invocation.author);
    if check.blocked {
        Err(BlockReason::Throttled(check.remaining))
    } else {
        Ok(())
    }
}

/// Counts one use of the command towards its throttle window.
pub fn record_use(cx: &GateCtxt<'_>) {
    if let Some(throttling) = &cx.command.metadata.throttling {
        cx.throttles
            .record(cx.command.name(), throttling, cx.invocation.author);
    }
}
