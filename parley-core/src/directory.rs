//! Guild lookups: granted permissions and whether users, channels and roles exist in a scope.

use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// Whose permissions are being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    User(Id<UserMarker>),
    /// The agent running the engine.
    Agent,
}

/// Read-only queries against the transport's view of a guild. Every method is a pure query.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Permissions `actor` holds in `channel_id`.
    async fn permissions(
        &self,
        actor: Actor,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> anyhow::Result<Permissions>;
    async fn member_exists(&self, guild_id: Id<GuildMarker>, user_id: Id<UserMarker>) -> anyhow::Result<bool>;
    async fn channel_exists(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> anyhow::Result<bool>;
    async fn role_exists(&self, guild_id: Id<GuildMarker>, role_id: Id<RoleMarker>) -> anyhow::Result<bool>;
}

/// Directory for transports without guild structure: everyone holds every permission and every
/// ID exists.
pub struct OpenDirectory;

#[async_trait]
impl GuildDirectory for OpenDirectory {
    async fn permissions(&self, _: Actor, _: Id<GuildMarker>, _: Id<ChannelMarker>) -> anyhow::Result<Permissions> {
        Ok(Permissions::all())
    }

    async fn member_exists(&self, _: Id<GuildMarker>, _: Id<UserMarker>) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn channel_exists(&self, _: Id<GuildMarker>, _: Id<ChannelMarker>) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn role_exists(&self, _: Id<GuildMarker>, _: Id<RoleMarker>) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Permissions from `required` that `granted` lacks. Administrators lack nothing.
pub fn missing_permissions(granted: Permissions, required: Permissions) -> Permissions {
    if granted.contains(Permissions::ADMINISTRATOR) {
        Permissions::empty()
    } else {
        required - granted
    }
}
