use crate::db::entity::user::{AccountStatus, TwoFactorMethod, Users};
use sqlx::postgres::PgConnection;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, name, email, password_hash, account_status, two_factor_enabled, \
     two_factor_method, totp_secret, failed_login_attempts, locked_until, lockout_count, \
     last_failed_attempt, created_at, updated_at";

/// Retrieves a user by their (already normalized) email address.
///
/// # Arguments
///
/// * `pool` - A reference to the PostgreSQL connection pool.
/// * `email` - The email address of the user.
///
/// # Returns
///
/// * `Result<Users, sqlx::Error>` - On success, returns a `Users` struct containing the user's details.
///   Returns `sqlx::Error::RowNotFound` when no account matches.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Users, sqlx::Error> {
    find_user_by_email(pool, email)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Like [`get_user_by_email`] but surfaces absence as `None` instead of an
/// error, for flows that deliberately do not distinguish the two (recovery
/// anti-enumeration).
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<Users>, sqlx::Error> {
    sqlx::query_as::<_, Users>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id(pool: &PgPool, user_id: i64) -> Result<Users, sqlx::Error> {
    sqlx::query_as::<_, Users>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Inserts a new user in `PENDING` state inside the caller's transaction.
///
/// # Arguments
///
/// * `conn` - The transaction connection; registration commits the user row
///   and the verification-email dispatch together.
/// * `name` - Sanitized display name.
/// * `email` - Normalized (lowercased, trimmed) email address.
/// * `password_hash` - Argon2id hash of the password.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error`; a unique-constraint violation on
/// `email` means the address is already registered.
pub async fn create_pending_user(
    conn: &mut PgConnection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<Users, sqlx::Error> {
    sqlx::query_as::<_, Users>(&format!(
        "INSERT INTO users (name, email, password_hash, account_status) \
         VALUES ($1, $2, $3, 'PENDING') RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(conn)
    .await
}

/// Flips a pending account to `ACTIVE` once its email has been verified.
pub async fn activate_user(conn: &mut PgConnection, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET account_status = 'ACTIVE', updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Atomically increments the failed login attempt counter and returns the
/// post-increment value.
///
/// The increment happens inside the UPDATE itself so two concurrent failed
/// attempts can never both observe the same counter and lose an update.
pub async fn increment_failed_attempts(pool: &PgPool, user_id: i64) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE users SET failed_login_attempts = failed_login_attempts + 1, \
         last_failed_attempt = NOW(), updated_at = NOW() \
         WHERE id = $1 RETURNING failed_login_attempts",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Starts a lockout window and bumps the cumulative lockout counter. The
/// cumulative counter is never reset anywhere.
pub async fn apply_lockout(
    pool: &PgPool,
    user_id: i64,
    locked_until: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET locked_until = $2, lockout_count = lockout_count + 1, \
         updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(locked_until)
    .execute(pool)
    .await?;
    Ok(())
}

/// Lazily clears a lockout whose window has already passed and resets the
/// attempt counter. The `locked_until <= NOW()` guard keeps a concurrent
/// fresh lockout from being wiped.
pub async fn clear_expired_lockout(pool: &PgPool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET locked_until = NULL, failed_login_attempts = 0, updated_at = NOW() \
         WHERE id = $1 AND locked_until IS NOT NULL AND locked_until <= NOW()",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Resets the failed login attempt counter after a successful password
/// check. Leaves `lockout_count` untouched.
pub async fn reset_failed_login_attempts(pool: &PgPool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET failed_login_attempts = 0, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replaces the password hash inside the caller's transaction. Used by the
/// recovery flow together with the consuming code check.
pub async fn update_password(
    conn: &mut PgConnection,
    user_id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(conn)
        .await?;
    Ok(())
}

/// Stores a freshly generated TOTP secret. The method is provisioned but
/// 2FA stays disabled until the user verifies one code against it.
pub async fn store_totp_secret(
    pool: &PgPool,
    user_id: i64,
    secret: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET totp_secret = $2, two_factor_method = 'TOTP', \
         two_factor_enabled = FALSE, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(secret)
    .execute(pool)
    .await?;
    Ok(())
}

/// Marks TOTP as confirmed and live for the user.
pub async fn enable_totp(pool: &PgPool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET two_factor_enabled = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Enables email-based 2FA inside the caller's transaction, after the setup
/// challenge code has been consumed.
pub async fn enable_email_two_factor(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET two_factor_method = 'EMAIL', two_factor_enabled = TRUE, \
         updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Snapshot of the fields the login state machine reads, for logging.
pub fn describe_account(user: &Users) -> String {
    let method = match user.two_factor_method {
        TwoFactorMethod::None => "none",
        TwoFactorMethod::Totp => "totp",
        TwoFactorMethod::Email => "email",
    };
    let status = match user.account_status {
        AccountStatus::Pending => "pending",
        AccountStatus::Active => "active",
        AccountStatus::Inactive => "inactive",
    };
    format!(
        "user_id={} status={} 2fa_enabled={} 2fa_method={} failed_attempts={} lockouts={}",
        user.id, status, user.two_factor_enabled, method, user.failed_login_attempts, user.lockout_count
    )
}
