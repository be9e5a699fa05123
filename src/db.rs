//! SQLite pool setup and embedded migrations.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

/// Open (creating if missing) the SQLite database at `path` and apply any
/// pending migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
pub async fn connect(path: &str) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("invalid database path: {path}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    migrate(&pool).await?;

    info!("Database ready at {path}");

    Ok(pool)
}

/// Apply embedded migrations. Applied versions are tracked by `SQLx` in the
/// `_sqlx_migrations` table, so this is safe to run on every startup.
///
/// # Errors
///
/// Returns an error if a migration statement fails.
pub async fn migrate(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

/// In-memory pool for tests. Capped at a single connection because each
/// SQLite `:memory:` connection is its own database.
///
/// # Errors
///
/// Returns an error if the pool cannot be created or migrations fail.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(":memory:")
        .context("invalid in-memory connection string")?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("Failed to create in-memory pool")?;

    migrate(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_applies_migrations() -> Result<()> {
        let pool = connect_in_memory().await?;
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'refresh_tokens', 'audit_logs')",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(tables, 3);
        Ok(())
    }

    #[tokio::test]
    async fn migrate_is_idempotent() -> Result<()> {
        let pool = connect_in_memory().await?;
        migrate(&pool).await?;
        Ok(())
    }
}
