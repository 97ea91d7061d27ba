use crate::db::entity::code::{CodePurpose, OneTimeCode};
use sqlx::postgres::PgConnection;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::PgPool;

const CODE_COLUMNS: &str = "id, email, purpose, code, created_at, expires_at, used";

/// Marks every unused code for the (email, purpose) pair as used. Issuing a
/// new code always runs this first so at most one unused code is valid per
/// pair at any time.
pub async fn invalidate_unused(
    conn: &mut PgConnection,
    email: &str,
    purpose: CodePurpose,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE one_time_codes SET used = TRUE WHERE email = $1 AND purpose = $2 AND used = FALSE",
    )
    .bind(email)
    .bind(purpose)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Stores a freshly generated code with an absolute expiry.
pub async fn insert_code(
    conn: &mut PgConnection,
    email: &str,
    purpose: CodePurpose,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO one_time_codes (email, purpose, code, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(email)
    .bind(purpose)
    .bind(code)
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Non-consuming validation: returns the row iff it matches, is unused and
/// unexpired. Callers must not use this for flows that redeem the code.
pub async fn find_valid(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    code: &str,
) -> Result<Option<OneTimeCode>, sqlx::Error> {
    sqlx::query_as::<_, OneTimeCode>(&format!(
        "SELECT {CODE_COLUMNS} FROM one_time_codes \
         WHERE email = $1 AND purpose = $2 AND code = $3 AND used = FALSE AND expires_at > NOW() \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(email)
    .bind(purpose)
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Transactional variant of [`find_valid`]: locks the row with
/// `FOR UPDATE` so two concurrent redemptions of the same code serialize,
/// and the loser re-reads `used = TRUE`.
pub async fn lock_valid(
    conn: &mut PgConnection,
    email: &str,
    purpose: CodePurpose,
    code: &str,
) -> Result<Option<OneTimeCode>, sqlx::Error> {
    sqlx::query_as::<_, OneTimeCode>(&format!(
        "SELECT {CODE_COLUMNS} FROM one_time_codes \
         WHERE email = $1 AND purpose = $2 AND code = $3 AND used = FALSE AND expires_at > NOW() \
         ORDER BY created_at DESC LIMIT 1 FOR UPDATE"
    ))
    .bind(email)
    .bind(purpose)
    .bind(code)
    .fetch_optional(conn)
    .await
}

/// Flips the used flag. false -> true only; rows are never un-used.
pub async fn mark_used(conn: &mut PgConnection, code_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE one_time_codes SET used = TRUE WHERE id = $1")
        .bind(code_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Garbage-collects rows that are expired or already spent. Run by the
/// hourly maintenance sweep.
pub async fn delete_spent(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM one_time_codes WHERE expires_at < NOW() OR used = TRUE")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
