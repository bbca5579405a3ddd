//! Per-scope settings: command/group enablement overrides and the command prefix.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_database::DatabaseHandler;
use parley_database::model::command_enablement::CommandEnablement;
use parley_database::model::prefix::Prefix;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

/// Storage for per-scope settings. The engine only ever reads and writes through this trait.
#[async_trait]
pub trait Settings: Send + Sync {
    /// The stored enablement override for `key` (e.g. `cmd-ping`), if any.
    async fn enabled(&self, guild_id: Id<GuildMarker>, key: &str) -> anyhow::Result<Option<bool>>;
    async fn set_enabled(&self, guild_id: Id<GuildMarker>, key: &str, enabled: bool) -> anyhow::Result<()>;
    /// The scope's prefix. `None` means the default prefix applies; an empty string means only
    /// mentions work as a prefix.
    async fn prefix(&self, guild_id: Id<GuildMarker>) -> anyhow::Result<Option<String>>;
    async fn set_prefix(&self, guild_id: Id<GuildMarker>, prefix: Option<String>) -> anyhow::Result<()>;
}

/// Settings kept in process memory. Lost on restart.
#[derive(Default)]
pub struct MemorySettings {
    enablement: Mutex<HashMap<(Id<GuildMarker>, String), bool>>,
    prefixes: Mutex<HashMap<Id<GuildMarker>, String>>,
}
impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Settings for MemorySettings {
    async fn enabled(&self, guild_id: Id<GuildMarker>, key: &str) -> anyhow::Result<Option<bool>> {
        let enablement = self.enablement.lock().unwrap_or_else(|e| e.into_inner());
        Ok(enablement.get(&(guild_id, key.to_owned())).copied())
    }

    async fn set_enabled(&self, guild_id: Id<GuildMarker>, key: &str, enabled: bool) -> anyhow::Result<()> {
        self.enablement
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((guild_id, key.to_owned()), enabled);
        Ok(())
    }

    async fn prefix(&self, guild_id: Id<GuildMarker>) -> anyhow::Result<Option<String>> {
        let prefixes = self.prefixes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(prefixes.get(&guild_id).cloned())
    }

    async fn set_prefix(&self, guild_id: Id<GuildMarker>, prefix: Option<String>) -> anyhow::Result<()> {
        let mut prefixes = self.prefixes.lock().unwrap_or_else(|e| e.into_inner());
        match prefix {
            Some(prefix) => prefixes.insert(guild_id, prefix),
            None => prefixes.remove(&guild_id),
        };
        Ok(())
    }
}

#[async_trait]
impl Settings for DatabaseHandler {
    async fn enabled(&self, guild_id: Id<GuildMarker>, key: &str) -> anyhow::Result<Option<bool>> {
        CommandEnablement::get(self, guild_id.get(), key).await
    }

    async fn set_enabled(&self, guild_id: Id<GuildMarker>, key: &str, enabled: bool) -> anyhow::Result<()> {
        CommandEnablement {
            guild_id: guild_id.get() as i64,
            target: key.to_owned(),
            enabled,
        }
        .set(self)
        .await
    }

    async fn prefix(&self, guild_id: Id<GuildMarker>) -> anyhow::Result<Option<String>> {
        Ok(Prefix::get(self, guild_id.get()).await?.map(|p| p.prefix))
    }

    async fn set_prefix(&self, guild_id: Id<GuildMarker>, prefix: Option<String>) -> anyhow::Result<()> {
        match prefix {
            Some(prefix) => Prefix { prefix }.set(self, guild_id.get()).await,
            None => Prefix::delete(self, guild_id.get()).await,
        }
    }
}
