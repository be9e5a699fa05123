//! Database access for users and refresh tokens.

use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};
use tracing::Instrument;

use super::principal::Role;

/// Full user row as needed by the login path.
pub(crate) struct UserRecord {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password_hash: String,
    pub(crate) role: Role,
}

/// Listing row for the admin surface; never exposes the password hash.
pub(crate) struct UserSummary {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: Role,
    pub(crate) created_at: i64,
}

fn row_role(value: &str) -> Result<Role> {
    Role::from_db(value).with_context(|| format!("unknown role in database: {value}"))
}

pub(super) async fn lookup_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, name, password_hash, role FROM users WHERE email = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.map(|row| {
        Ok(UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            role: row_role(row.get("role"))?,
        })
    })
    .transpose()
}

pub(super) async fn lookup_user_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, name, password_hash, role FROM users WHERE id = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.map(|row| {
        Ok(UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            role: row_role(row.get("role"))?,
        })
    })
    .transpose()
}

/// Store a freshly minted refresh token for `user_id`.
///
/// Revoking every prior token and inserting the new one happens in a single
/// transaction: a concurrent login for the same user serializes at the
/// database, and the last commit owns the sole active token.
pub(super) async fn issue_refresh_token(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: i64,
) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("begin refresh token transaction")?;

    let query = "UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "UPDATE");
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke prior refresh tokens")?;

    let query = "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;

    tx.commit().await.context("commit refresh token transaction")
}

/// Resolve a refresh token to its owner, enforcing revocation and expiry in
/// the query itself so the time check happens at the database level.
pub(super) async fn lookup_active_refresh_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<Option<i64>> {
    let query = r"
        SELECT user_id
        FROM refresh_tokens
        WHERE token = ?
          AND revoked = 0
          AND expires_at > strftime('%s', 'now')
        LIMIT 1
    ";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup refresh token")?;

    Ok(row.map(|row| row.get("user_id")))
}

/// Mark a refresh token revoked. Idempotent: revoking an unknown or
/// already-revoked token is not an error.
pub(super) async fn revoke_refresh_token(pool: &Pool<Sqlite>, token: &str) -> Result<()> {
    let query = "UPDATE refresh_tokens SET revoked = 1 WHERE token = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "UPDATE");
    sqlx::query(query)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;
    Ok(())
}

/// Insert a new user. Returns `None` when the email is already taken.
pub(super) async fn create_user(
    pool: &Pool<Sqlite>,
    email: &str,
    name: &str,
    password_hash: &str,
    role: Role,
) -> Result<Option<i64>> {
    let query = "INSERT INTO users (email, name, password_hash, role) VALUES (?, ?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    let result = sqlx::query(query)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(done) => Ok(Some(done.last_insert_rowid())),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(super) async fn list_users(pool: &Pool<Sqlite>) -> Result<Vec<UserSummary>> {
    let query = "SELECT id, email, name, role, created_at FROM users ORDER BY id";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    rows.into_iter()
        .map(|row| {
            Ok(UserSummary {
                id: row.get("id"),
                email: row.get("email"),
                name: row.get("name"),
                role: row_role(row.get("role"))?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

/// Delete a user. Their refresh tokens go with them (`ON DELETE CASCADE`);
/// audit log rows are kept. Returns `false` when no such user exists.
pub(super) async fn delete_user(pool: &Pool<Sqlite>, id: i64) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "DELETE");
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;
    Ok(result.rows_affected() > 0)
}

/// Create the bootstrap admin if the email is not present yet. Returns `true`
/// when a row was inserted.
pub(crate) async fn seed_admin(
    pool: &Pool<Sqlite>,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<bool> {
    Ok(create_user(pool, email, name, password_hash, Role::Admin)
        .await?
        .is_some())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.as_ref() == "2067" || code.as_ref() == "1555"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn insert_user(pool: &Pool<Sqlite>, email: &str, role: Role) -> Result<i64> {
        create_user(pool, email, "Test User", "hash", role)
            .await?
            .context("user should insert")
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() -> Result<()> {
        let pool = connect_in_memory().await?;
        assert!(insert_user(&pool, "ana@orbit.com", Role::Admin).await.is_ok());
        let second = create_user(&pool, "ana@orbit.com", "Other", "hash", Role::Employee).await?;
        assert!(second.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn issue_refresh_token_keeps_one_active_per_user() -> Result<()> {
        let pool = connect_in_memory().await?;
        let user_id = insert_user(&pool, "ana@orbit.com", Role::Admin).await?;
        let horizon = crate::api::handlers::auth::utils::unix_now() + 3600;

        issue_refresh_token(&pool, user_id, "token-one", horizon).await?;
        issue_refresh_token(&pool, user_id, "token-two", horizon).await?;

        assert_eq!(lookup_active_refresh_token(&pool, "token-one").await?, None);
        assert_eq!(
            lookup_active_refresh_token(&pool, "token-two").await?,
            Some(user_id)
        );

        // Revoked rows stay behind for the audit trail.
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&pool)
            .await?;
        assert_eq!(total, 2);
        Ok(())
    }

    #[tokio::test]
    async fn expired_refresh_token_is_not_active() -> Result<()> {
        let pool = connect_in_memory().await?;
        let user_id = insert_user(&pool, "ana@orbit.com", Role::Admin).await?;
        let past = crate::api::handlers::auth::utils::unix_now() - 10;

        issue_refresh_token(&pool, user_id, "stale-token", past).await?;
        assert_eq!(lookup_active_refresh_token(&pool, "stale-token").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_refresh_token_is_idempotent() -> Result<()> {
        let pool = connect_in_memory().await?;
        let user_id = insert_user(&pool, "ana@orbit.com", Role::Admin).await?;
        let horizon = crate::api::handlers::auth::utils::unix_now() + 3600;
        issue_refresh_token(&pool, user_id, "token", horizon).await?;

        revoke_refresh_token(&pool, "token").await?;
        assert_eq!(lookup_active_refresh_token(&pool, "token").await?, None);
        revoke_refresh_token(&pool, "token").await?;
        revoke_refresh_token(&pool, "never-issued").await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_user_cascades_refresh_tokens() -> Result<()> {
        let pool = connect_in_memory().await?;
        let user_id = insert_user(&pool, "ana@orbit.com", Role::Admin).await?;
        let horizon = crate::api::handlers::auth::utils::unix_now() + 3600;
        issue_refresh_token(&pool, user_id, "token", horizon).await?;

        assert!(delete_user(&pool, user_id).await?);
        assert!(!delete_user(&pool, user_id).await?);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&pool)
            .await?;
        assert_eq!(remaining, 0);
        Ok(())
    }

    #[tokio::test]
    async fn seed_admin_is_idempotent() -> Result<()> {
        let pool = connect_in_memory().await?;
        assert!(seed_admin(&pool, "admin@orbit.com", "Admin", "hash").await?);
        assert!(!seed_admin(&pool, "admin@orbit.com", "Admin", "hash").await?);

        let record = lookup_user_by_email(&pool, "admin@orbit.com")
            .await?
            .context("seeded admin should exist")?;
        assert_eq!(record.role, Role::Admin);
        Ok(())
    }
}
