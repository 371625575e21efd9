use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use shopfront_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Single-connection pool. Tests run against `sqlite::memory:`, where every
/// pooled connection would otherwise see its own empty database.
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let config = DatabaseConfig {
        url: database_url.to_owned(),
        max_connections: 1,
        timeout_secs: 30,
    };
    connect_with_settings(&config).await
}

pub async fn connect_with_settings(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Catalog traffic is read-heavy with write bursts (seed,
                // bulk create): WAL with NORMAL sync, and a busy timeout so
                // concurrent writers queue instead of failing.
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA synchronous = NORMAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}
