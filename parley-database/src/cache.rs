use std::time::Duration;

use moka::sync::Cache;

use crate::model::prefix::Prefix;

/// In-memory cache collection for frequently accessed areas of the database.
///
/// Negative lookups are cached too (`None`), since most guilds never change either setting and
/// every incoming message asks for the prefix.
pub struct DatabaseCache {
    prefixes: Cache<u64, Option<Prefix>>,
    enablement: Cache<(u64, String), Option<bool>>,
}
impl DatabaseCache {
    pub fn new() -> Self {
        DatabaseCache {
            // 10,000 entries max, if not accessed in 5 mins then remove from cache
            prefixes: Cache::builder()
                .max_capacity(10000)
                .time_to_idle(Duration::from_secs(60 * 5))
                .build(),
            enablement: Cache::builder()
                .max_capacity(50000)
                .time_to_idle(Duration::from_secs(60 * 5))
                .build(),
        }
    }

    pub fn get_prefix(&self, guild_id: u64) -> Option<Option<Prefix>> {
        self.prefixes.get(&guild_id)
    }

    pub fn set_prefix(&self, guild_id: u64, prefix: Option<Prefix>) {
        self.prefixes.insert(guild_id, prefix);
    }

    pub fn get_enablement(&self, guild_id: u64, target: &str) -> Option<Option<bool>> {
        self.enablement.get(&(guild_id, target.to_owned()))
    }

    pub fn set_enablement(&self, guild_id: u64, target: &str, enabled: Option<bool>) {
        self.enablement.insert((guild_id, target.to_owned()), enabled);
    }
}
