use anyhow::Context;

use crate::DatabaseHandler;

/// Per-guild enablement override for a command or a group. `target` is the settings key, e.g.
/// `cmd-ping` or `grp-util`.
#[derive(sqlx::FromRow, Clone, Debug)]
pub struct CommandEnablement {
    pub guild_id: i64,
    pub target: String,
    pub enabled: bool,
}
impl CommandEnablement {
    /// Returns the stored override, or `None` if the guild never changed it.
    pub async fn get(handler: &DatabaseHandler, guild_id: u64, target: &str) -> anyhow::Result<Option<bool>> {
        if let Some(enabled) = handler.cache.get_enablement(guild_id, target) {
            return Ok(enabled);
        }

        let query = "SELECT * FROM command_enablement WHERE guild_id = $1 AND target = $2";
        let result = sqlx::query_as::<_, Self>(query)
            .bind(guild_id as i64)
            .bind(target)
            .fetch_optional(&handler.pool)
            .await
            .context("Failed to fetch command enablement from database")?;

        let enabled = result.map(|row| row.enabled);
        handler.cache.set_enablement(guild_id, target, enabled);

        Ok(enabled)
    }

    pub async fn set(&self, handler: &DatabaseHandler) -> anyhow::Result<()> {
        let query = r#"INSERT INTO command_enablement(guild_id, target, enabled) VALUES($1, $2, $3) ON CONFLICT (guild_id, target) DO UPDATE SET enabled = $3"#;

        sqlx::query(query)
            .bind(self.guild_id)
            .bind(&self.target)
            .bind(self.enabled)
            .execute(&handler.pool)
            .await
            .context("Failed to store command enablement")?;

        handler
            .cache
            .set_enablement(self.guild_id as u64, &self.target, Some(self.enabled));

        Ok(())
    }
}
