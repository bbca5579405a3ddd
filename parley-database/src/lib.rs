use cache::DatabaseCache;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod cache;
pub mod model;

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS prefixes (guild BIGINT PRIMARY KEY, prefix TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS command_enablement (
        guild_id BIGINT NOT NULL,
        target TEXT NOT NULL,
        enabled BOOLEAN NOT NULL,
        PRIMARY KEY (guild_id, target)
    )",
];

/// Database handler providing a connection to the database and helper methods for reading and
/// writing per-scope command settings.
pub struct DatabaseHandler {
    pool: PgPool,
    cache: DatabaseCache,
}
impl DatabaseHandler {
    pub async fn new(url: String, safe_url: String) -> anyhow::Result<Self> {
        info!("Connecting to database on {}", safe_url);

        let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;

        info!("Connected to database on {}", safe_url);

        for migration in MIGRATIONS {
            sqlx::query(migration).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            cache: DatabaseCache::new(),
        })
    }
}
