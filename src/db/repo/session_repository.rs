use sqlx::postgres::PgConnection;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Whitelists a freshly issued token. Only the token hash is stored.
pub async fn insert_session(
    pool: &PgPool,
    user_id: i64,
    token_hash: &str,
    device: &str,
    ip: &str,
    user_agent: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO active_sessions (user_id, token_hash, device, ip, user_agent) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(device)
    .bind(ip)
    .bind(user_agent)
    .execute(pool)
    .await?;
    Ok(())
}

/// Whitelist membership check. A missing row means the token is revoked no
/// matter what its signature and expiry say.
pub async fn session_exists(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
    let row: Option<i64> =
        sqlx::query_scalar("SELECT id FROM active_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Bumps `last_used_at` for the idle-session sweep.
pub async fn touch_session(pool: &PgPool, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE active_sessions SET last_used_at = NOW() WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Logout: deletes the single matching row.
pub async fn delete_by_hash(pool: &PgPool, token_hash: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// "Sign out other devices": removes every session for the user except the
/// one presenting `token_hash`. Returns the number revoked.
pub async fn delete_all_except(
    pool: &PgPool,
    user_id: i64,
    token_hash: &str,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM active_sessions WHERE user_id = $1 AND token_hash != $2")
            .bind(user_id)
            .bind(token_hash)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Revokes everything for the user, inside the caller's transaction. Used
/// after a password reset.
pub async fn delete_all_for_user(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Garbage-collects sessions idle past the cutoff (30 days by default).
pub async fn delete_idle_since(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE last_used_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
