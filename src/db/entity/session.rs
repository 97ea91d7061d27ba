use sqlx::types::chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One whitelisted session. Only the SHA-256 hash of the issued token is
/// stored; deleting the row revokes the token regardless of its remaining
/// JWT validity.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSession {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub device: String,
    pub ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}
